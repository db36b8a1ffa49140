use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use log::info;
use serde::Deserialize;

use crate::merge::MergePolicy;
use crate::spreadsheet::SheetLayout;

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Deserialize, Debug)]
#[serde(default)]
pub(crate) struct Config {
    /// Database file path
    pub(crate) database: PathBuf,
    /// Schema applied when the database is created. The bundled schema is used when unset.
    pub(crate) schema_file: Option<PathBuf>,
    /// Category given to every imported transaction
    pub(crate) category: String,
    pub(crate) merge_policy: MergePolicy,
    /// Table to load into when only a file is given
    pub(crate) default_table: String,
    pub(crate) layout: SheetLayout,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database: PathBuf::from("database/database.db"),
            schema_file: None,
            category: "Övrigt".to_string(),
            merge_policy: MergePolicy::default(),
            default_table: "transactions".to_string(),
            layout: SheetLayout::default(),
        }
    }
}

impl Config {
    /// `<config dir>/pfinance/config.toml`
    pub(crate) fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pfinance").join(CONFIG_FILE_NAME))
    }

    /// Load config from the default location. A missing file gives the default config.
    pub(crate) fn load_default() -> anyhow::Result<Config> {
        match Config::default_path() {
            Some(path) if path.is_file() => Config::load_from_file(&path),
            _ => Ok(Config::default()),
        }
    }

    pub(crate) fn load_from_file(file_path: &Path) -> anyhow::Result<Config> {
        info!("Loading config from {}", file_path.display());
        let content = fs::read_to_string(file_path)
            .with_context(|| format!("Unable to read config file {}", file_path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", file_path.display()))?;
        Ok(config)
    }
}
