use anyhow::Result;
use tracing::info;

use crate::config::MigrationConfig;
use crate::error::SkipReason;
use crate::model::{ReferenceRecord, VENDORS};
use crate::normalization::date::parse_slash_date;
use crate::pipeline::{BatchPipeline, Prepared, RowSkip};
use crate::source::{self, SourceRow, VENDOR_COLUMNS};
use crate::stats::RunSummary;
use crate::store::DocumentStore;

pub fn vendor_record(row: &SourceRow) -> Result<ReferenceRecord, RowSkip> {
    let id = row.get("VENDOR_ID");
    if id.is_empty() {
        return Err(RowSkip::new("<blank>", SkipReason::MissingKey));
    }
    let date = |field: &'static str| {
        parse_slash_date(row.get(field))
            .map_err(|source| RowSkip::new(id, SkipReason::InvalidDate { field, source }))
    };
    Ok(ReferenceRecord {
        id: id.to_string(),
        name: row.get("VENDOR_NAME").to_string(),
        created_at: Some(date("CREATE_DATE")?),
        updated_at: Some(date("LAST_MODIFIED_DATE")?),
    })
}

fn vendor_doc(row: &SourceRow) -> Result<Prepared, RowSkip> {
    let rec = vendor_record(row)?;
    Prepared::new(rec.id.clone(), &rec).map_err(|reason| RowSkip::new(rec.id.clone(), reason))
}

pub async fn migrate_vendors(
    store: &dyn DocumentStore,
    rows: &[SourceRow],
    cfg: &MigrationConfig,
) -> Result<RunSummary> {
    store.ensure_collections(&[VENDORS]).await?;
    Ok(BatchPipeline::new(VENDORS, cfg.batch_size)?
        .run(store, rows, vendor_doc)
        .await)
}

pub async fn migrate_vendors_from_file(
    store: &dyn DocumentStore,
    cfg: &MigrationConfig,
) -> Result<RunSummary> {
    let rows = source::read_rows(&cfg.vendors_file, VENDOR_COLUMNS, cfg.delimiter)?;
    info!(rows = rows.len(), file = %cfg.vendors_file.display(), "vendors loaded");
    migrate_vendors(store, &rows, cfg).await
}
