use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::MigrationError;
use crate::resolver::ResolutionPolicy;
use crate::store::RetryPolicy;
use crate::util::env as env_util;

pub const DEFAULT_BATCH_SIZE: usize = 500;

/// What to do with category codes whose parent code is absent from the input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrphanPolicy {
    /// Leave them out of the tree and report them.
    #[default]
    Drop,
    /// Abort the category run.
    Fail,
}

impl FromStr for OrphanPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(Self::Drop),
            "fail" => Ok(Self::Fail),
            other => Err(format!("unknown orphan policy '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub batch_size: usize,
    pub retry: RetryPolicy,
    pub categories_file: PathBuf,
    pub vendors_file: PathBuf,
    pub products_file: PathBuf,
    pub delimiter: u8,
    pub resolution: ResolutionPolicy,
    pub orphans: OrphanPolicy,
    pub missing_vendor_report: PathBuf,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 5,
            batch_size: DEFAULT_BATCH_SIZE,
            retry: RetryPolicy::default(),
            categories_file: PathBuf::from("data/categories.csv"),
            vendors_file: PathBuf::from("data/vendors.csv"),
            products_file: PathBuf::from("data/products.csv"),
            delimiter: b',',
            resolution: ResolutionPolicy::Lenient,
            orphans: OrphanPolicy::Drop,
            missing_vendor_report: PathBuf::from("missing_vendors.csv"),
        }
    }
}

impl MigrationConfig {
    /// Reads every setting from the environment (after `.env`), falling back to defaults.
    pub fn from_env() -> Result<Self, MigrationError> {
        let d = Self::default();
        let path = |key: &str, default: PathBuf| {
            env_util::env_opt(key).map(PathBuf::from).unwrap_or(default)
        };
        let cfg = Self {
            database_url: env_util::db_url().ok(),
            max_connections: parse_count("DB_MAX_CONNS", d.max_connections)?,
            batch_size: parse_count("MIGRATE_BATCH_SIZE", d.batch_size)?,
            retry: RetryPolicy {
                attempts: env_util::env_parse("MIGRATE_CONNECT_RETRIES", d.retry.attempts),
                backoff: Duration::from_millis(env_util::env_parse(
                    "MIGRATE_CONNECT_BACKOFF_MS",
                    d.retry.backoff.as_millis() as u64,
                )),
            },
            categories_file: path("CATEGORIES_FILE", d.categories_file),
            vendors_file: path("VENDORS_FILE", d.vendors_file),
            products_file: path("PRODUCTS_FILE", d.products_file),
            delimiter: match env_util::env_opt("MIGRATE_DELIMITER") {
                Some(raw) => parse_delimiter(&raw)?,
                None => d.delimiter,
            },
            resolution: parse_setting("MIGRATE_RESOLUTION", d.resolution)?,
            orphans: parse_setting("MIGRATE_ORPHANS", d.orphans)?,
            missing_vendor_report: path("MISSING_VENDOR_REPORT", d.missing_vendor_report),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), MigrationError> {
        if self.batch_size == 0 {
            return Err(MigrationError::Configuration(
                "MIGRATE_BATCH_SIZE must be a positive integer".into(),
            ));
        }
        if self.max_connections == 0 {
            return Err(MigrationError::Configuration(
                "DB_MAX_CONNS must be a positive integer".into(),
            ));
        }
        Ok(())
    }

    pub fn require_database_url(&self) -> Result<&str, MigrationError> {
        self.database_url.as_deref().ok_or_else(|| {
            MigrationError::Configuration(
                "database URL not configured; set DATABASE_URL or DB_HOST/DB_USERNAME".into(),
            )
        })
    }
}

fn parse_setting<T>(key: &str, default: T) -> Result<T, MigrationError>
where
    T: FromStr<Err = String>,
{
    match env_util::env_opt(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e: String| MigrationError::Configuration(format!("{key}: {e}"))),
        None => Ok(default),
    }
}

/// Unlike `env_parse`, a value that is set but unreadable is an error, not the default.
fn parse_count<T: FromStr>(key: &str, default: T) -> Result<T, MigrationError> {
    match env_util::env_opt(key) {
        Some(raw) => count_value(key, &raw),
        None => Ok(default),
    }
}

fn count_value<T: FromStr>(key: &str, raw: &str) -> Result<T, MigrationError> {
    raw.trim().parse().map_err(|_| {
        MigrationError::Configuration(format!("{key} must be a positive integer, got '{raw}'"))
    })
}

/// Accepts one ASCII character, or the words `tab` / `\t`.
pub fn parse_delimiter(raw: &str) -> Result<u8, MigrationError> {
    match raw {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        s if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
        other => Err(MigrationError::Configuration(format!(
            "delimiter must be a single ASCII character, got '{other}'"
        ))),
    }
}
