use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    types::Json,
    PgPool, QueryBuilder,
};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::store::{
    connect_with_retry, BulkWriteResult, DocumentStore, RetryPolicy, UpsertOp, WriteFailure,
};

/// Postgres-backed document store: one `(id TEXT PRIMARY KEY, doc JSONB)` table per collection.
#[derive(Clone)]
pub struct Db {
    pub pool: PgPool,
}

impl Db {
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let use_prepared = crate::util::env::env_flag("USE_PREPARED", false);
        let mut connect_options = PgConnectOptions::from_str(database_url)?;

        // Ensure TLS is enabled when DSN contains sslmode=require
        if database_url.contains("sslmode=require") && !database_url.contains("sslmode=disable") {
            connect_options = connect_options.ssl_mode(PgSslMode::Require);
        }

        if !use_prepared {
            // PgBouncer txn mode safe
            connect_options = connect_options.statement_cache_capacity(0);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .connect_with(connect_options)
            .await?;
        info!("connected to db");
        Ok(Self { pool })
    }

    #[instrument(skip(database_url))]
    pub async fn connect_with_retry(
        database_url: &str,
        max_connections: u32,
        policy: RetryPolicy,
    ) -> Result<Self> {
        connect_with_retry(policy, || Self::connect(database_url, max_connections)).await
    }
}

/// Collections map straight onto table names, so only plain identifiers are allowed.
fn table_ident(collection: &str) -> Result<String> {
    if collection.is_empty()
        || !collection
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        bail!("invalid collection name '{collection}'");
    }
    Ok(format!("\"{collection}\""))
}

/// Keep only the last op per id; Postgres refuses to touch one row twice in a statement.
fn last_write_wins(ops: Vec<UpsertOp>) -> Vec<UpsertOp> {
    let mut seen = std::collections::HashSet::new();
    let mut out: Vec<UpsertOp> = ops
        .into_iter()
        .rev()
        .filter(|op| seen.insert(op.id.clone()))
        .collect();
    out.reverse();
    out
}

impl Db {
    async fn upsert_many(&self, table: &str, ops: &[UpsertOp]) -> Result<BulkWriteResult> {
        let mut qb: QueryBuilder<'_, sqlx::Postgres> =
            QueryBuilder::new(format!("INSERT INTO {table} (id, doc) "));
        qb.push_values(ops, |mut b, op| {
            b.push_bind(&op.id).push_bind(Json(&op.doc));
        });
        // xmax = 0 only for freshly inserted rows.
        qb.push(" ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc RETURNING (xmax = 0)");
        let flags: Vec<bool> = qb
            .build_query_scalar::<bool>()
            .persistent(false)
            .fetch_all(&self.pool)
            .await?;
        let inserted = flags.iter().filter(|f| **f).count() as u64;
        Ok(BulkWriteResult {
            inserted,
            updated: flags.len() as u64 - inserted,
            failures: Vec::new(),
        })
    }

    async fn upsert_one(&self, table: &str, op: &UpsertOp) -> Result<bool> {
        let sql = format!(
            "INSERT INTO {table} (id, doc) VALUES ($1, $2)
             ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc RETURNING (xmax = 0)"
        );
        let inserted: bool = sqlx::query_scalar(&sql)
            .persistent(false)
            .bind(&op.id)
            .bind(Json(&op.doc))
            .fetch_one(&self.pool)
            .await?;
        Ok(inserted)
    }
}

#[async_trait]
impl DocumentStore for Db {
    #[instrument(skip(self))]
    async fn ensure_collections(&self, names: &[&str]) -> Result<()> {
        for name in names {
            let table = table_ident(name)?;
            sqlx::raw_sql(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (id TEXT PRIMARY KEY, doc JSONB NOT NULL)"
            ))
            .execute(&self.pool)
            .await
            .with_context(|| format!("creating collection {name}"))?;
        }
        Ok(())
    }

    #[instrument(skip(self, ops), fields(ops = ops.len()))]
    async fn bulk_upsert(&self, collection: &str, ops: Vec<UpsertOp>) -> Result<BulkWriteResult> {
        if ops.is_empty() {
            return Ok(BulkWriteResult::default());
        }
        let table = table_ident(collection)?;
        let ops = last_write_wins(ops);
        match self.upsert_many(&table, &ops).await {
            Ok(res) => return Ok(res),
            Err(err) => {
                warn!(collection, error = %err, "bulk upsert failed; retrying row by row");
            }
        }
        // Unordered semantics: one bad document must not keep the rest out.
        let mut result = BulkWriteResult::default();
        for op in &ops {
            match self.upsert_one(&table, op).await {
                Ok(true) => result.inserted += 1,
                Ok(false) => result.updated += 1,
                Err(err) => {
                    debug!(collection, id = %op.id, error = %err, "document upsert failed");
                    result.failures.push(WriteFailure {
                        id: op.id.clone(),
                        message: err.to_string(),
                    });
                }
            }
        }
        if result.failures.len() == ops.len() {
            // Nothing landed: the store is the problem, not the documents.
            bail!(
                "bulk upsert into {collection} failed for every document: {}",
                result.failures[0].message
            );
        }
        Ok(result)
    }

    #[instrument(skip(self))]
    async fn find_all(&self, collection: &str) -> Result<Vec<Value>> {
        let table = table_ident(collection)?;
        let rows: Vec<Json<Value>> =
            sqlx::query_scalar(&format!("SELECT doc FROM {table} ORDER BY id"))
                .persistent(false)
                .fetch_all(&self.pool)
                .await
                .with_context(|| format!("reading collection {collection}"))?;
        Ok(rows.into_iter().map(|Json(v)| v).collect())
    }

    #[instrument(skip(self))]
    async fn count(&self, collection: &str) -> Result<u64> {
        let table = table_ident(collection)?;
        let n: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*)::BIGINT FROM {table}"))
            .persistent(false)
            .fetch_one(&self.pool)
            .await?;
        Ok(n.max(0) as u64)
    }

    async fn close(&self) {
        self.pool.close().await;
        info!("db pool closed");
    }
}
