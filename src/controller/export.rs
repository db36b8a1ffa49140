use std::path::Path;

use anyhow::anyhow;
use csv::WriterBuilder;
use log::info;

use crate::db::Database;

/// Export a table to a csv file, in stored order. Returns the number of rows written.
pub(crate) fn execute_export(db: &Database, table: &str, file_path: &Path) -> anyhow::Result<usize> {
    let records = db.read(table).ok_or_else(|| anyhow!("Table '{}' does not exist", table))?;

    let mut csv_writer = WriterBuilder::new().has_headers(true).from_path(file_path)?;
    for r in records.iter() {
        csv_writer.serialize(r)?;
    }
    csv_writer.flush()?;

    info!("Exported {} transactions from '{}' to {}", records.len(), table, file_path.display());
    Ok(records.len())
}
