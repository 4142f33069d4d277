use std::path::PathBuf;

use thiserror::Error;

use crate::normalization::date::DateError;

/// Conditions that abort a whole migration run.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("{}: missing required columns: {}", path.display(), missing.join(", "))]
    MissingColumns { path: PathBuf, missing: Vec<String> },
    #[error("{}: no data rows", .0.display())]
    EmptyDataFile(PathBuf),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("prerequisite collection '{0}' is empty; migrate it before products")]
    EmptyPrerequisite(&'static str),
    #[error("could not connect to the document store after {attempts} attempts: {last_error}")]
    ConnectRetriesExhausted { attempts: u32, last_error: String },
    #[error("{} category codes have no parent in the input (first: {})", codes.len(), codes.first().map(String::as_str).unwrap_or("-"))]
    OrphanedCodes { codes: Vec<String> },
}

/// Why a single row was excluded from its batch. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("category '{category}' not found")]
    MissingCategory { category: String },
    #[error("vendor '{vendor}' and category '{category}' not found")]
    MissingBoth { vendor: String, category: String },
    /// Only produced under the strict resolution policy.
    #[error("vendor '{vendor}' not found")]
    MissingVendor { vendor: String },
    #[error("{field}: {source}")]
    InvalidDate {
        field: &'static str,
        #[source]
        source: DateError,
    },
    #[error("malformed code '{0}'")]
    MalformedCode(String),
    #[error("missing natural key")]
    MissingKey,
    #[error("could not encode document: {0}")]
    Unencodable(String),
}

impl SkipReason {
    /// The row's vendor reference did not resolve.
    pub fn vendor_unresolved(&self) -> bool {
        matches!(self, Self::MissingBoth { .. } | Self::MissingVendor { .. })
    }
}
