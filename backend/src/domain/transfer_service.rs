//! CSV import and export of record collections.
//!
//! Files use the same layout as the delimited-text store: no header, one
//! record per line in attribute order.

use anyhow::{Context, Result};
use shared::{validate_keys, Record};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::info;

use crate::storage::csv::backend::{read_rows, write_rows};

/// Write each record's attributes as one line
pub fn export_records<R: Record, W: Write>(records: &[R], writer: W) -> Result<()> {
    let rows: Vec<_> = records.iter().map(Record::attributes).collect();
    write_rows(writer, rows.iter().map(|row| row.as_slice()))
        .with_context(|| format!("Failed to write {} records", R::TABLE))
}

/// Parse every non-empty line into a record.
///
/// The first line that cannot become a record fails the whole import, as does
/// an identifier used twice; nothing is returned for the lines before it.
pub fn import_records<R: Record, Rd: Read>(reader: Rd) -> Result<Vec<R>> {
    let rows = read_rows(reader).with_context(|| format!("Failed to read {} records", R::TABLE))?;
    let records = rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            R::from_row(row)
                .with_context(|| format!("Record {} is not a valid {} row", index + 1, R::TABLE))
        })
        .collect::<Result<Vec<R>>>()?;
    validate_keys(&records)?;
    Ok(records)
}

pub fn export_to_path<R: Record, P: AsRef<Path>>(records: &[R], path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    export_records(records, &mut writer)?;
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Exported {} {} records to {}", records.len(), R::TABLE, path.display());
    Ok(())
}

pub fn import_from_path<R: Record, P: AsRef<Path>>(path: P) -> Result<Vec<R>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let records = import_records(BufReader::new(file))
        .with_context(|| format!("Failed to import {}", path.display()))?;
    info!("Imported {} {} records from {}", records.len(), R::TABLE, path.display());
    Ok(records)
}
