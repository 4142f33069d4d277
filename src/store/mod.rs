//! Document-store seam: the pipeline only ever talks to [`DocumentStore`].

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::MigrationError;

pub mod memory;

pub use memory::MemoryStore;

/// Replace-or-insert of one whole document, matched on its natural key.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOp {
    pub id: String,
    pub doc: Value,
}

impl UpsertOp {
    pub fn new(id: impl Into<String>, doc: Value) -> Self {
        Self { id: id.into(), doc }
    }

    pub fn from_serialize<T: Serialize>(id: impl Into<String>, doc: &T) -> Result<Self> {
        Ok(Self::new(id, serde_json::to_value(doc)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFailure {
    pub id: String,
    pub message: String,
}

/// Outcome of one unordered bulk write. Per-document failures land in `failures`;
/// every other document in the batch is still applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkWriteResult {
    pub inserted: u64,
    pub updated: u64,
    pub failures: Vec<WriteFailure>,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Creates any missing collections. Existing data is left alone.
    async fn ensure_collections(&self, names: &[&str]) -> Result<()>;

    /// Unordered bulk upsert. `Err` means the store itself failed, not a single document.
    async fn bulk_upsert(&self, collection: &str, ops: Vec<UpsertOp>) -> Result<BulkWriteResult>;

    async fn find_all(&self, collection: &str) -> Result<Vec<Value>>;

    async fn count(&self, collection: &str) -> Result<u64>;

    async fn close(&self);
}

/// Bounded connection attempts with a fixed delay between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            backoff: Duration::from_secs(2),
        }
    }
}

pub async fn connect_with_retry<T, F, Fut>(policy: RetryPolicy, mut connect: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut last_error = String::new();
    for attempt in 1..=attempts {
        match connect().await {
            Ok(conn) => {
                info!(attempt, "document store connected");
                return Ok(conn);
            }
            Err(err) => {
                warn!(attempt, attempts, error = %err, "document store connect failed");
                last_error = format!("{err:#}");
                if attempt < attempts {
                    tokio::time::sleep(policy.backoff).await;
                }
            }
        }
    }
    Err(MigrationError::ConnectRetriesExhausted {
        attempts,
        last_error,
    }
    .into())
}
