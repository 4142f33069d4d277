//! Per-record-type drivers. Categories and vendors must land before products run.

pub mod categories;
pub mod products;
pub mod vendors;

use std::fmt;

use anyhow::Result;

use crate::config::MigrationConfig;
use crate::stats::RunSummary;
use crate::store::DocumentStore;

pub use categories::{migrate_categories, migrate_categories_from_file, CategoryReport};
pub use products::{migrate_products, migrate_products_from_file, ProductReport};
pub use vendors::{migrate_vendors, migrate_vendors_from_file};

#[derive(Debug, Clone)]
pub struct MigrationReport {
    pub categories: CategoryReport,
    pub vendors: RunSummary,
    pub products: ProductReport,
}

/// Categories, then vendors, then products, against one store.
pub async fn migrate_all(store: &dyn DocumentStore, cfg: &MigrationConfig) -> Result<MigrationReport> {
    let categories = migrate_categories_from_file(store, cfg).await?;
    let vendors = migrate_vendors_from_file(store, cfg).await?;
    let products = migrate_products_from_file(store, cfg).await?;
    Ok(MigrationReport {
        categories,
        vendors,
        products,
    })
}

impl fmt::Display for CategoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary)?;
        writeln!(f, "  tree roots:         {}", self.roots)?;
        writeln!(f, "  orphaned codes:     {}", self.orphans.len())?;
        for code in self.orphans.iter().take(crate::stats::MAX_EXAMPLES) {
            writeln!(f, "    e.g. {code}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ProductReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary)?;
        writeln!(f, "  missing-vendor rows: {}", self.missing_vendor_rows)
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.categories, self.vendors, self.products)
    }
}
