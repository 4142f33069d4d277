pub mod config;
pub mod diagnostics;
pub mod error;
pub mod hierarchy;
pub mod logging;
pub mod migrate;
pub mod model;
pub mod normalization;
pub mod pipeline;
pub mod resolver;
pub mod source;
pub mod stats;
pub mod store;

pub mod util {
    pub mod db;
    pub mod env;
}

pub use config::MigrationConfig;
pub use error::{MigrationError, SkipReason};
pub use stats::{RunSummary, SkipStatistics};
pub use store::{DocumentStore, MemoryStore};

use anyhow::Result;

/// Opens the configured store: Postgres with bounded retries, or memory for dry runs.
pub async fn open_store(cfg: &MigrationConfig, dry_run: bool) -> Result<Box<dyn DocumentStore>> {
    if dry_run {
        tracing::info!("dry run: writes go to an in-memory store");
        return Ok(Box::new(MemoryStore::new()));
    }
    let url = cfg.require_database_url()?;
    let db = util::db::Db::connect_with_retry(url, cfg.max_connections, cfg.retry).await?;
    Ok(Box::new(db))
}
