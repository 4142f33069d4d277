use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::{MigrationConfig, OrphanPolicy};
use crate::error::{MigrationError, SkipReason};
use crate::hierarchy::{build_forest, Forest};
use crate::model::{
    CategoryTreeDocument, CodeLabelRecord, ReferenceRecord, CATEGORIES, CATEGORY_TREE,
    CATEGORY_TREE_ID,
};
use crate::normalization::code::is_valid_code;
use crate::pipeline::{BatchPipeline, Prepared, RowSkip};
use crate::source::{self, SourceRow, CATEGORY_COLUMNS};
use crate::stats::RunSummary;
use crate::store::{DocumentStore, UpsertOp};

#[derive(Debug, Clone)]
pub struct CategoryReport {
    pub summary: RunSummary,
    pub roots: usize,
    pub orphans: Vec<String>,
}

pub fn code_label(row: &SourceRow) -> Result<CodeLabelRecord, RowSkip> {
    let code = row.get("CATEGORY_CODE");
    if code.is_empty() {
        return Err(RowSkip::new("<blank>", SkipReason::MissingKey));
    }
    if !is_valid_code(code) {
        return Err(RowSkip::new(code, SkipReason::MalformedCode(code.to_string())));
    }
    Ok(CodeLabelRecord {
        code: code.to_string(),
        label: row.get("CATEGORY_NAME").to_string(),
    })
}

fn category_doc(row: &SourceRow) -> Result<Prepared, RowSkip> {
    let rec = code_label(row)?;
    let doc = ReferenceRecord {
        id: rec.code.clone(),
        name: rec.label,
        created_at: None,
        updated_at: None,
    };
    Prepared::new(rec.code.clone(), &doc).map_err(|reason| RowSkip::new(rec.code, reason))
}

/// Tree assembly over the rows that carry a valid code.
pub fn forest_from_rows(rows: &[SourceRow]) -> Forest {
    let records: Vec<CodeLabelRecord> = rows.iter().filter_map(|r| code_label(r).ok()).collect();
    build_forest(&records)
}

pub async fn migrate_categories(
    store: &dyn DocumentStore,
    rows: &[SourceRow],
    cfg: &MigrationConfig,
) -> Result<CategoryReport> {
    let forest = forest_from_rows(rows);
    if !forest.orphans.is_empty() {
        match cfg.orphans {
            OrphanPolicy::Fail => {
                return Err(MigrationError::OrphanedCodes {
                    codes: forest.orphans,
                }
                .into())
            }
            OrphanPolicy::Drop => warn!(
                count = forest.orphans.len(),
                first = %forest.orphans[0],
                "category codes without a parent are left out of the tree"
            ),
        }
    }

    store.ensure_collections(&[CATEGORIES, CATEGORY_TREE]).await?;
    let summary = BatchPipeline::new(CATEGORIES, cfg.batch_size)?
        .run(store, rows, category_doc)
        .await;

    let tree = CategoryTreeDocument {
        id: CATEGORY_TREE_ID,
        children: forest.roots,
    };
    let roots = tree.children.len();
    let res = store
        .bulk_upsert(
            CATEGORY_TREE,
            vec![UpsertOp::from_serialize(CATEGORY_TREE_ID, &tree)?],
        )
        .await
        .context("writing category tree")?;
    if let Some(failure) = res.failures.first() {
        anyhow::bail!("category tree was not written: {}", failure.message);
    }
    info!(roots, orphans = forest.orphans.len(), "category tree written");

    Ok(CategoryReport {
        summary,
        roots,
        orphans: forest.orphans,
    })
}

pub async fn migrate_categories_from_file(
    store: &dyn DocumentStore,
    cfg: &MigrationConfig,
) -> Result<CategoryReport> {
    let rows = source::read_rows(&cfg.categories_file, CATEGORY_COLUMNS, cfg.delimiter)?;
    info!(rows = rows.len(), file = %cfg.categories_file.display(), "categories loaded");
    migrate_categories(store, &rows, cfg).await
}
