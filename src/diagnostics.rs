use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

use crate::source::{SourceRow, PRODUCT_COLUMNS};

/// Written in place of a blank vendor field so operators can tell "blank" from "unknown id".
pub const NO_VENDOR: &str = "<NO VENDOR>";

/// Writes product rows whose vendor could not be resolved, in the product file's column order.
pub fn write_missing_vendor_report<'a, W, I>(out: W, rows: I) -> Result<usize>
where
    W: Write,
    I: IntoIterator<Item = &'a SourceRow>,
{
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record(PRODUCT_COLUMNS)?;
    let mut written = 0;
    for row in rows {
        let record: Vec<&str> = PRODUCT_COLUMNS
            .iter()
            .map(|col| match (*col, row.get(col)) {
                ("VENDOR", "") => NO_VENDOR,
                (_, value) => value,
            })
            .collect();
        wtr.write_record(&record)?;
        written += 1;
    }
    wtr.flush()?;
    Ok(written)
}

pub fn write_missing_vendor_file<'a, I>(path: &Path, rows: I) -> Result<usize>
where
    I: IntoIterator<Item = &'a SourceRow>,
{
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let file = std::fs::File::create(path).with_context(|| format!("open {}", path.display()))?;
    write_missing_vendor_report(std::io::BufWriter::new(file), rows)
        .with_context(|| format!("write {}", path.display()))
}
