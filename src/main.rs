use std::path::PathBuf;
use std::process;

use anyhow::bail;
use clap::Parser;
use env_logger::Env;

use crate::config::Config;
use crate::controller::{run_command, Command};
use crate::merge::MergePolicy;

mod common;
mod config;
mod controller;
mod db;
mod merge;
mod spreadsheet;
mod transaction;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// Shows the current data in database.
    #[clap(short, long)]
    show: bool,

    /// Loads the specified spreadsheet into the specified table. The table name may be left out
    /// to load into the default table.
    #[clap(short, long, num_args = 1..=2, value_names = ["TABLE_NAME", "FILE_PATH"])]
    load: Option<Vec<String>>,

    /// Exports the specified table to a csv file.
    #[clap(short, long, num_args = 2, value_names = ["TABLE_NAME", "FILE_PATH"])]
    export: Option<Vec<String>>,

    /// Parse and merge the loaded file but only print the result.
    #[clap(long)]
    dry_run: bool,

    /// How loaded transactions are merged with the ones already in the table.
    #[clap(long, value_enum)]
    policy: Option<MergePolicy>,

    /// Category given to every loaded transaction.
    #[clap(long)]
    category: Option<String>,

    /// Database file path.
    #[clap(long)]
    database: Option<PathBuf>,

    /// Config file path.
    #[clap(long)]
    config: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli: Cli = Cli::parse();

    if let Err(err) = run(cli) {
        eprintln!("Error: {:#}", err);
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load_default()?,
    };
    if let Some(database) = cli.database {
        config.database = database;
    }
    if let Some(category) = cli.category {
        config.category = category;
    }
    if let Some(policy) = cli.policy {
        config.merge_policy = policy;
    }

    let load = match cli.load.as_deref() {
        None => None,
        Some([file_path]) => Some((config.default_table.clone(), PathBuf::from(file_path))),
        Some([table, file_path]) => Some((table.clone(), PathBuf::from(file_path))),
        Some(other) => bail!("--load takes a table name and a file path, got {:?}", other),
    };
    let export = match cli.export.as_deref() {
        None => None,
        Some([table, file_path]) => Some((table.clone(), PathBuf::from(file_path))),
        Some(other) => bail!("--export takes a table name and a file path, got {:?}", other),
    };

    let command = Command {
        show: cli.show,
        load,
        export,
        dry_run: cli.dry_run,
    };
    run_command(&command, &config)
}
