use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use crate::config::MigrationConfig;
use crate::diagnostics;
use crate::error::{MigrationError, SkipReason};
use crate::model::{ProductRecord, ReferenceRecord, CATEGORIES, PRODUCTS, VENDORS};
use crate::normalization::date::parse_compact_date;
use crate::normalization::fields::{non_blank, yes_no};
use crate::pipeline::{BatchPipeline, Prepared, RowSkip};
use crate::resolver::{ReferenceIndex, ReferenceResolver};
use crate::source::{self, SourceRow, PRODUCT_COLUMNS};
use crate::stats::RunSummary;
use crate::store::DocumentStore;

#[derive(Debug, Clone)]
pub struct ProductReport {
    pub summary: RunSummary,
    /// Rows listed in the missing-vendor file.
    pub missing_vendor_rows: usize,
}

pub fn product_record(
    row: &SourceRow,
    resolver: &ReferenceResolver,
) -> Result<ProductRecord, RowSkip> {
    let sku = row.get("SKU");
    if sku.is_empty() {
        return Err(RowSkip::new("<blank>", SkipReason::MissingKey));
    }
    let skip = |reason| RowSkip::new(sku, reason);

    let refs = resolver
        .resolve(row.get("VENDOR"), row.get("CATEGORY_CODE"))
        .map_err(skip)?;
    let date = |field: &'static str| {
        parse_compact_date(row.get(field))
            .map_err(|source| skip(SkipReason::InvalidDate { field, source }))
    };

    Ok(ProductRecord {
        sku: sku.to_string(),
        manufacturer_part_number: non_blank(row.get("MANUFACTURER_PART_NO")),
        name: row.get("PRODUCT_NAME").to_string(),
        description: row.get("DESCRIPTION").to_string(),
        color: non_blank(row.get("COLOR")),
        active: yes_no(row.get("ACTIVE_STATUS")),
        discontinued: yes_no(row.get("DISCONTINUED")),
        created_at: date("CREATED_DATE")?,
        updated_at: date("LAST_MODIFIED_DATE")?,
        vendor: refs.vendor,
        category: refs.category,
    })
}

fn product_doc(row: &SourceRow, resolver: &ReferenceResolver) -> Result<Prepared, RowSkip> {
    let rec = product_record(row, resolver)?;
    let degraded = rec.vendor.is_none();
    Prepared::new(rec.sku.clone(), &rec)
        .map(|p| p.degraded(degraded))
        .map_err(|reason| RowSkip::new(rec.sku.clone(), reason))
}

fn parse_references(collection: &str, docs: Vec<Value>) -> Vec<ReferenceRecord> {
    docs.into_iter()
        .filter_map(|doc| match serde_json::from_value::<ReferenceRecord>(doc) {
            Ok(rec) => Some(rec),
            Err(err) => {
                warn!(collection, error = %err, "ignoring unreadable reference document");
                None
            }
        })
        .collect()
}

/// Builds the resolver from what the category and vendor runs persisted.
pub async fn load_resolver(
    store: &dyn DocumentStore,
    cfg: &MigrationConfig,
) -> Result<ReferenceResolver> {
    for collection in [VENDORS, CATEGORIES] {
        if store.count(collection).await? == 0 {
            return Err(MigrationError::EmptyPrerequisite(collection).into());
        }
    }
    let vendors = parse_references(VENDORS, store.find_all(VENDORS).await?);
    let categories = parse_references(CATEGORIES, store.find_all(CATEGORIES).await?);
    info!(
        vendors = vendors.len(),
        categories = categories.len(),
        policy = ?cfg.resolution,
        "reference indices built"
    );
    Ok(ReferenceResolver::new(
        ReferenceIndex::build(&vendors),
        ReferenceIndex::build(&categories),
        cfg.resolution,
    ))
}

/// Runs the product pipeline; does not write the missing-vendor file.
pub async fn migrate_products(
    store: &dyn DocumentStore,
    rows: &[SourceRow],
    cfg: &MigrationConfig,
) -> Result<RunSummary> {
    let resolver = load_resolver(store, cfg).await?;
    store.ensure_collections(&[PRODUCTS]).await?;
    Ok(BatchPipeline::new(PRODUCTS, cfg.batch_size)?
        .run(store, rows, |row: &SourceRow| product_doc(row, &resolver))
        .await)
}

pub async fn migrate_products_from_file(
    store: &dyn DocumentStore,
    cfg: &MigrationConfig,
) -> Result<ProductReport> {
    let rows = source::read_rows(&cfg.products_file, PRODUCT_COLUMNS, cfg.delimiter)?;
    info!(rows = rows.len(), file = %cfg.products_file.display(), "products loaded");
    let summary = migrate_products(store, &rows, cfg).await?;

    let missing = summary.vendor_misses.iter().filter_map(|&i| rows.get(i));
    let missing_vendor_rows =
        diagnostics::write_missing_vendor_file(&cfg.missing_vendor_report, missing)
            .context("writing missing-vendor report")?;
    info!(
        rows = missing_vendor_rows,
        file = %cfg.missing_vendor_report.display(),
        "missing-vendor report written"
    );
    Ok(ProductReport {
        summary,
        missing_vendor_rows,
    })
}
