use std::path::PathBuf;

use anyhow::Context;
use log::info;

use crate::config::Config;
use crate::db::Database;
use crate::spreadsheet;

mod export;
mod import;
mod show;

use import::{execute_import, ImportOptions};

/// What one invocation was asked to do
#[derive(Debug, Default)]
pub(crate) struct Command {
    pub(crate) show: bool,
    pub(crate) load: Option<(String, PathBuf)>,
    pub(crate) export: Option<(String, PathBuf)>,
    pub(crate) dry_run: bool,
}

impl Command {
    fn is_empty(&self) -> bool {
        !self.show && self.load.is_none() && self.export.is_none()
    }
}

/// Run a command against the configured database. The database is only opened once the
/// import file has been validated, and is closed before returning.
pub(crate) fn run_command(command: &Command, config: &Config) -> anyhow::Result<()> {
    if command.is_empty() {
        info!("Nothing to do. Use --show, --load or --export");
        return Ok(());
    }

    if let Some((_, file_path)) = &command.load {
        spreadsheet::check_source(file_path, &config.layout)?;
    }

    let mut db = Database::open(&config.database, config.schema_file.clone())
        .with_context(|| format!("Unable to open database {}", config.database.display()))?;

    if command.show {
        show::print_database(&db)?;
    }

    if let Some((table, file_path)) = &command.load {
        let options = ImportOptions {
            layout: &config.layout,
            category: &config.category,
            policy: config.merge_policy,
            dry_run: command.dry_run,
        };
        let summary = execute_import(&mut db, table, file_path, &options)
            .with_context(|| format!("Unable to load {} into '{}'", file_path.display(), table))?;

        if summary.persisted {
            println!("Imported {} transactions, table '{}' now has {}", summary.parsed, table, summary.outcome.records.len());
        } else {
            println!("{}", show::render(&summary.outcome.records));
        }
    }

    if let Some((table, file_path)) = &command.export {
        let count = export::execute_export(&db, table, file_path)?;
        println!("Exported {} transactions to {}", count, file_path.display());
    }

    info!("Closing database {}", db.path().display());
    db.close()?;
    Ok(())
}
