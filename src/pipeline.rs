//! Fixed-size batches of row transforms, each submitted as one unordered bulk upsert.

use std::num::NonZeroUsize;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{MigrationError, SkipReason};
use crate::stats::{RunSummary, SkipStatistics};
use crate::store::{DocumentStore, UpsertOp};

/// A row that made it through its transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Prepared {
    pub op: UpsertOp,
    /// Written without an optional reference.
    pub degraded: bool,
}

impl Prepared {
    pub fn new<T: Serialize>(id: impl Into<String>, doc: &T) -> Result<Self, SkipReason> {
        UpsertOp::from_serialize(id, doc)
            .map(|op| Self {
                op,
                degraded: false,
            })
            .map_err(|e| SkipReason::Unencodable(e.to_string()))
    }

    pub fn degraded(mut self, degraded: bool) -> Self {
        self.degraded = degraded;
        self
    }
}

/// A row excluded from its batch, keyed for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSkip {
    pub key: String,
    pub reason: SkipReason,
}

impl RowSkip {
    pub fn new(key: impl Into<String>, reason: SkipReason) -> Self {
        Self {
            key: key.into(),
            reason,
        }
    }
}

/// What one batch contributes before its write is submitted.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub ops: Vec<UpsertOp>,
    /// Absolute input positions of degraded rows.
    pub degraded: Vec<usize>,
    /// Absolute input positions of rows whose vendor did not resolve, skipped or written.
    pub vendor_misses: Vec<usize>,
    pub skips: SkipStatistics,
}

/// Transforms one chunk. `offset` is the input position of its first row.
pub fn prepare_batch<R, F>(rows: &[R], offset: usize, transform: &F) -> BatchOutcome
where
    F: Fn(&R) -> Result<Prepared, RowSkip>,
{
    let mut out = BatchOutcome {
        ops: Vec::with_capacity(rows.len()),
        ..Default::default()
    };
    for (i, row) in rows.iter().enumerate() {
        match transform(row) {
            Ok(prepared) => {
                if prepared.degraded {
                    out.degraded.push(offset + i);
                    out.vendor_misses.push(offset + i);
                    out.skips.record_vendor_miss();
                }
                out.ops.push(prepared.op);
            }
            Err(skip) => {
                debug!(key = %skip.key, reason = %skip.reason, "row skipped");
                if skip.reason.vendor_unresolved() {
                    out.vendor_misses.push(offset + i);
                }
                out.skips.record_skip(&skip.key, &skip.reason);
            }
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct BatchPipeline {
    collection: String,
    batch_size: NonZeroUsize,
}

impl BatchPipeline {
    pub fn new(collection: impl Into<String>, batch_size: usize) -> Result<Self, MigrationError> {
        let batch_size = NonZeroUsize::new(batch_size).ok_or_else(|| {
            MigrationError::Configuration("batch size must be a positive integer".to_string())
        })?;
        Ok(Self {
            collection: collection.into(),
            batch_size,
        })
    }

    /// Runs every batch in input order. A batch's failures never stop the batches after it.
    pub async fn run<R, F>(
        &self,
        store: &dyn DocumentStore,
        rows: &[R],
        transform: F,
    ) -> RunSummary
    where
        F: Fn(&R) -> Result<Prepared, RowSkip>,
    {
        let size = self.batch_size.get();
        let mut summary = RunSummary {
            collection: self.collection.clone(),
            rows: rows.len(),
            ..Default::default()
        };

        for (n, chunk) in rows.chunks(size).enumerate() {
            let batch = prepare_batch(chunk, n * size, &transform);
            summary.skips.merge(batch.skips);
            summary.degraded.extend(batch.degraded);
            summary.vendor_misses.extend(batch.vendor_misses);
            if batch.ops.is_empty() {
                debug!(collection = %self.collection, batch = n, "batch had no writable rows");
                continue;
            }

            let ids: Vec<String> = batch.ops.iter().map(|op| op.id.clone()).collect();
            summary.batch_sizes.push(batch.ops.len());
            match store.bulk_upsert(&self.collection, batch.ops).await {
                Ok(res) => {
                    summary.inserted += res.inserted;
                    summary.updated += res.updated;
                    for failure in &res.failures {
                        summary.record_write_failure(&failure.id, &failure.message);
                    }
                    if !res.failures.is_empty() {
                        warn!(
                            collection = %self.collection,
                            batch = n,
                            failed = res.failures.len(),
                            "bulk write partially failed"
                        );
                    }
                    debug!(
                        collection = %self.collection,
                        batch = n,
                        inserted = res.inserted,
                        updated = res.updated,
                        "batch written"
                    );
                }
                Err(err) => {
                    warn!(
                        collection = %self.collection,
                        batch = n,
                        error = %err,
                        "bulk write failed"
                    );
                    let message = err.to_string();
                    for id in &ids {
                        summary.record_write_failure(id, &message);
                    }
                }
            }
        }

        info!(
            collection = %self.collection,
            rows = summary.rows,
            batches = summary.batches(),
            written = summary.written(),
            skipped = summary.skips.total,
            write_failures = summary.write_failures,
            "pipeline finished"
        );
        summary
    }
}
