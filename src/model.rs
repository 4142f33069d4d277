use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const CATEGORIES: &str = "categories";
pub const CATEGORY_TREE: &str = "categoryTree";
pub const VENDORS: &str = "vendors";
pub const PRODUCTS: &str = "products";

/// `_id` of the singleton document holding the whole category forest.
pub const CATEGORY_TREE_ID: &str = "categoryTree";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeLabelRecord {
    pub code: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: String,
    pub name: String,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Finds a node by id anywhere in this subtree.
    pub fn find(&self, id: &str) -> Option<&TreeNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTreeDocument {
    #[serde(rename = "_id")]
    pub id: &'static str,
    pub children: Vec<TreeNode>,
}

/// Persisted vendor or category. Categories carry no timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDate>,
    #[serde(rename = "updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDate>,
}

/// Denormalized `{_id, name}` snapshot embedded in product documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedRef {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
}

impl From<&ReferenceRecord> for EmbeddedRef {
    fn from(r: &ReferenceRecord) -> Self {
        Self {
            id: r.id.clone(),
            name: r.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(rename = "_id")]
    pub sku: String,
    #[serde(
        rename = "manufacturerPartNumber",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub manufacturer_part_number: Option<String>,
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub active: bool,
    pub discontinued: bool,
    #[serde(rename = "createdAt")]
    pub created_at: NaiveDate,
    #[serde(rename = "updatedAt")]
    pub updated_at: NaiveDate,
    pub vendor: Option<EmbeddedRef>,
    pub category: EmbeddedRef,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn product_serializes_with_null_vendor_and_absent_optionals() {
        let p = ProductRecord {
            sku: "A1".into(),
            manufacturer_part_number: None,
            name: "Widget".into(),
            description: "".into(),
            color: None,
            active: true,
            discontinued: false,
            created_at: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
            updated_at: NaiveDate::from_ymd_opt(2023, 1, 3).unwrap(),
            vendor: None,
            category: EmbeddedRef {
                id: "0101".into(),
                name: "Tools".into(),
            },
        };
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(
            v,
            json!({
                "_id": "A1",
                "name": "Widget",
                "description": "",
                "active": true,
                "discontinued": false,
                "createdAt": "2023-01-02",
                "updatedAt": "2023-01-03",
                "vendor": null,
                "category": {"_id": "0101", "name": "Tools"}
            })
        );
    }

    #[test]
    fn category_reference_reads_back_without_timestamps() {
        let r: ReferenceRecord =
            serde_json::from_value(json!({"_id": "01", "name": "Hardware"})).unwrap();
        assert_eq!(r.created_at, None);
        assert_eq!(EmbeddedRef::from(&r).name, "Hardware");
    }
}
