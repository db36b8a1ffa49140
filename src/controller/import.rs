use std::fs;
use std::path::Path;

use log::{info, warn};

use crate::common::IngestResult;
use crate::db::{Database, ImportReceipt};
use crate::merge::{self, MergeOutcome, MergePolicy};
use crate::spreadsheet::{self, SheetLayout};

pub(crate) struct ImportOptions<'a> {
    pub(crate) layout: &'a SheetLayout,
    pub(crate) category: &'a str,
    pub(crate) policy: MergePolicy,
    /// Parse and merge without writing anything
    pub(crate) dry_run: bool,
}

#[derive(Debug)]
pub(crate) struct ImportSummary {
    pub(crate) parsed: usize,
    pub(crate) outcome: MergeOutcome,
    pub(crate) persisted: bool,
}

/// Import a spreadsheet export into `table`.
///
/// The existing table is read, the file is parsed, both are merged under the configured
/// policy and the result replaces the table in a single transaction. Nothing is written
/// unless every earlier step succeeded.
pub(crate) fn execute_import(db: &mut Database, table: &str, path: &Path, options: &ImportOptions) -> IngestResult<ImportSummary> {
    spreadsheet::check_source(path, options.layout)?;

    if !options.dry_run {
        db.ensure_initialized()?;
    }

    let existing = db.read(table);
    match &existing {
        Some(records) => info!("Table '{}' has {} transactions", table, records.len()),
        None => info!("Table '{}' does not exist yet", table),
    }

    let incoming = spreadsheet::read_transactions(path, options.layout, options.category)?;
    let parsed = incoming.len();

    let file_md5 = format!("{:x}", md5::compute(fs::read(path)?));
    if let Some(imported_at) = db.previous_import(table, &file_md5) {
        warn!("{} was already imported into '{}' at {}", path.display(), table, imported_at);
    }

    let outcome = merge::merge(existing, incoming.into(), options.policy);
    info!("Merged with policy {}: {} kept, {} added, {} conflicting ignored",
        options.policy, outcome.kept, outcome.added, outcome.conflicts);
    if outcome.duplicates > 0 {
        warn!("Dropped {} duplicate transactions", outcome.duplicates);
    }
    if !outcome.records.has_unique_keys() {
        warn!("Table '{}' holds transactions sharing both date and category", table);
    }

    if options.dry_run {
        info!("This is a dry-run. Transactions are not imported");
        return Ok(ImportSummary { parsed, outcome, persisted: false });
    }

    let receipt = ImportReceipt {
        file_name: path.file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
        file_md5,
        record_count: parsed,
    };
    db.replace(table, &outcome.records, Some(&receipt))?;

    Ok(ImportSummary { parsed, outcome, persisted: true })
}
