//! Lookup indices over persisted vendors and categories, and product foreign-key resolution.

use std::collections::HashMap;
use std::str::FromStr;

use crate::error::SkipReason;
use crate::model::{EmbeddedRef, ReferenceRecord};
use crate::normalization::code::strip_leading_zeros;

/// Which references a product must resolve to be written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResolutionPolicy {
    /// Category mandatory, vendor nullable.
    #[default]
    Lenient,
    /// Both mandatory.
    Strict,
}

impl FromStr for ResolutionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lenient" => Ok(Self::Lenient),
            "strict" => Ok(Self::Strict),
            other => Err(format!("unknown resolution policy '{other}'")),
        }
    }
}

/// Read-only map from id (and zero-stripped alias) to a reference snapshot.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex {
    entries: HashMap<String, EmbeddedRef>,
    records: usize,
}

impl ReferenceIndex {
    pub fn build<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a ReferenceRecord>,
    {
        let mut entries = HashMap::new();
        let mut aliases = Vec::new();
        let mut count = 0;
        for rec in records {
            count += 1;
            let snapshot = EmbeddedRef::from(rec);
            let alias = strip_leading_zeros(&rec.id);
            if alias != rec.id {
                aliases.push((alias.to_string(), snapshot.clone()));
            }
            entries.insert(rec.id.clone(), snapshot);
        }
        // Literal ids win over aliases that collide with them.
        for (alias, snapshot) in aliases {
            entries.entry(alias).or_insert(snapshot);
        }
        Self {
            entries,
            records: count,
        }
    }

    /// Literal lookup first, then the zero-stripped form.
    pub fn lookup(&self, raw: &str) -> Option<&EmbeddedRef> {
        let key = raw.trim();
        if key.is_empty() {
            return None;
        }
        self.entries
            .get(key)
            .or_else(|| self.entries.get(strip_leading_zeros(key)))
    }

    pub fn len(&self) -> usize {
        self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub vendor: Option<EmbeddedRef>,
    pub category: EmbeddedRef,
}

#[derive(Debug, Clone)]
pub struct ReferenceResolver {
    vendors: ReferenceIndex,
    categories: ReferenceIndex,
    policy: ResolutionPolicy,
}

impl ReferenceResolver {
    pub fn new(
        vendors: ReferenceIndex,
        categories: ReferenceIndex,
        policy: ResolutionPolicy,
    ) -> Self {
        Self {
            vendors,
            categories,
            policy,
        }
    }

    pub fn resolve(&self, vendor: &str, category: &str) -> Result<Resolved, SkipReason> {
        let vendor_ref = self.vendors.lookup(vendor);
        let Some(category_ref) = self.categories.lookup(category) else {
            return Err(match vendor_ref {
                None => SkipReason::MissingBoth {
                    vendor: vendor.trim().to_string(),
                    category: category.trim().to_string(),
                },
                Some(_) => SkipReason::MissingCategory {
                    category: category.trim().to_string(),
                },
            });
        };
        if vendor_ref.is_none() && self.policy == ResolutionPolicy::Strict {
            return Err(SkipReason::MissingVendor {
                vendor: vendor.trim().to_string(),
            });
        }
        Ok(Resolved {
            vendor: vendor_ref.cloned(),
            category: category_ref.clone(),
        })
    }
}
