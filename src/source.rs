use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use indexmap::IndexMap;

use crate::error::MigrationError;

pub const CATEGORY_COLUMNS: &[&str] = &["CATEGORY_CODE", "CATEGORY_NAME"];
pub const VENDOR_COLUMNS: &[&str] = &[
    "VENDOR_ID",
    "VENDOR_NAME",
    "CREATE_DATE",
    "LAST_MODIFIED_DATE",
];
pub const PRODUCT_COLUMNS: &[&str] = &[
    "SKU",
    "MANUFACTURER_PART_NO",
    "PRODUCT_NAME",
    "VENDOR",
    "DESCRIPTION",
    "ACTIVE_STATUS",
    "DISCONTINUED",
    "CREATED_DATE",
    "LAST_MODIFIED_DATE",
    "COLOR",
    "CATEGORY_CODE",
];

/// One data row as named, trimmed string fields in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceRow {
    fields: IndexMap<String, String>,
}

impl SourceRow {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Field value, or "" when the column is absent.
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, column: &str, value: impl Into<String>) {
        self.fields.insert(column.to_string(), value.into());
    }

    fn is_blank(&self) -> bool {
        self.fields.values().all(|v| v.is_empty())
    }
}

/// Reads a delimited file with a header row.
///
/// Missing required columns and files without data rows are fatal. Fully blank rows are
/// dropped. Short rows read their missing trailing fields as "".
pub fn read_rows(path: &Path, required: &[&str], delimiter: u8) -> Result<Vec<SourceRow>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let rows = parse_rows(
        BufReader::with_capacity(1 << 20, file),
        path,
        required,
        delimiter,
    )?;
    if rows.is_empty() {
        return Err(MigrationError::EmptyDataFile(path.to_path_buf()).into());
    }
    Ok(rows)
}

fn parse_rows<R: Read>(
    reader: R,
    path: &Path,
    required: &[&str],
    delimiter: u8,
) -> Result<Vec<SourceRow>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .trim(Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .with_context(|| format!("read header of {}", path.display()))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    let missing: Vec<String> = required
        .iter()
        .filter(|col| !headers.iter().any(|h| h == *col))
        .map(|col| col.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(MigrationError::MissingColumns {
            path: path.to_path_buf(),
            missing,
        }
        .into());
    }

    let mut rows = Vec::new();
    let mut rec = StringRecord::new();
    while rdr
        .read_record(&mut rec)
        .with_context(|| format!("read {}", path.display()))?
    {
        let row = SourceRow::from_pairs(
            headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.clone(), rec.get(i).unwrap_or("").to_string())),
        );
        if !row.is_blank() {
            rows.push(row);
        }
    }
    Ok(rows)
}
