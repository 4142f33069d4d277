use std::fmt;

use crate::error::SkipReason;

/// Upper bound on diagnostic examples kept per run.
pub const MAX_EXAMPLES: usize = 5;

/// Row-level outcomes of one migration run. Counts are reported, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkipStatistics {
    /// Rows excluded from their batch.
    pub total: u64,
    /// Rows whose vendor did not resolve, written or not.
    pub missing_vendor: u64,
    /// Rows whose category did not resolve; always skipped.
    pub missing_category: u64,
    /// Rows counted in both of the above.
    pub missing_both: u64,
    pub other_errors: u64,
    pub examples: Vec<String>,
}

impl SkipStatistics {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Counts a row that was excluded from its batch.
    pub fn record_skip(&mut self, key: &str, reason: &SkipReason) {
        self.total += 1;
        match reason {
            SkipReason::MissingCategory { .. } => self.missing_category += 1,
            SkipReason::MissingBoth { .. } => {
                self.missing_category += 1;
                self.missing_vendor += 1;
                self.missing_both += 1;
            }
            SkipReason::MissingVendor { .. } => self.missing_vendor += 1,
            SkipReason::InvalidDate { .. }
            | SkipReason::MalformedCode(_)
            | SkipReason::MissingKey
            | SkipReason::Unencodable(_) => self.other_errors += 1,
        }
        self.push_example(format!("{key}: {reason}"));
    }

    /// Counts a row that was written without its optional vendor.
    pub fn record_vendor_miss(&mut self) {
        self.missing_vendor += 1;
    }

    pub fn merge(&mut self, other: SkipStatistics) {
        self.total += other.total;
        self.missing_vendor += other.missing_vendor;
        self.missing_category += other.missing_category;
        self.missing_both += other.missing_both;
        self.other_errors += other.other_errors;
        for ex in other.examples {
            self.push_example(ex);
        }
    }

    fn push_example(&mut self, example: String) {
        if self.examples.len() < MAX_EXAMPLES {
            self.examples.push(example);
        }
    }
}

impl fmt::Display for SkipStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  skipped rows:       {}", self.total)?;
        writeln!(f, "    missing category: {}", self.missing_category)?;
        writeln!(f, "    missing both:     {}", self.missing_both)?;
        writeln!(f, "    other errors:     {}", self.other_errors)?;
        writeln!(f, "  missing vendor:     {}", self.missing_vendor)?;
        for ex in &self.examples {
            writeln!(f, "    e.g. {ex}")?;
        }
        Ok(())
    }
}

/// Everything one pipeline run did, for the final report.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub collection: String,
    pub rows: usize,
    pub batch_sizes: Vec<usize>,
    pub inserted: u64,
    pub updated: u64,
    pub write_failures: u64,
    pub write_failure_examples: Vec<String>,
    /// Input positions of rows written without an optional reference.
    pub degraded: Vec<usize>,
    /// Input positions of rows whose vendor did not resolve, in input order.
    pub vendor_misses: Vec<usize>,
    pub skips: SkipStatistics,
}

impl RunSummary {
    pub fn batches(&self) -> usize {
        self.batch_sizes.len()
    }

    pub fn submitted(&self) -> usize {
        self.batch_sizes.iter().sum()
    }

    pub fn written(&self) -> u64 {
        self.inserted + self.updated
    }

    pub(crate) fn record_write_failure(&mut self, id: &str, message: &str) {
        self.write_failures += 1;
        if self.write_failure_examples.len() < MAX_EXAMPLES {
            self.write_failure_examples.push(format!("{id}: {message}"));
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.collection)?;
        writeln!(f, "  input rows:         {}", self.rows)?;
        writeln!(f, "  batches:            {}", self.batches())?;
        writeln!(f, "  submitted:          {}", self.submitted())?;
        writeln!(
            f,
            "  written:            {} ({} new, {} updated)",
            self.written(),
            self.inserted,
            self.updated
        )?;
        writeln!(f, "  write failures:     {}", self.write_failures)?;
        for ex in &self.write_failure_examples {
            writeln!(f, "    e.g. {ex}")?;
        }
        write!(f, "{}", self.skips)
    }
}
