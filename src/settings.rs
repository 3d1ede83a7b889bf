use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::parser::extract::SelectorStrings;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub db_path: PathBuf,
    /// Directory of saved review pages, one `<game_id>.html` per game.
    pub pages_dir: PathBuf,
    pub selectors: SelectorStrings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            db_path: PathBuf::from("chess_analytics.db"),
            pages_dir: PathBuf::from("pages"),
            selectors: SelectorStrings::default(),
        }
    }
}

/// Defaults, then `chess_review_stats.toml` if present, then `CHESS_*`
/// variables (`CHESS_DB_PATH`, `CHESS_SELECTORS__USERNAME`, ...).
pub fn load() -> Result<Settings> {
    Config::builder()
        .add_source(File::with_name("chess_review_stats").required(false))
        .add_source(env_source())
        .build()
        .context("Failed to read configuration")?
        .try_deserialize()
        .context("Invalid configuration")
}

fn env_source() -> Environment {
    Environment::with_prefix("CHESS")
        .prefix_separator("_")
        .separator("__")
}
