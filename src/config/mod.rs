use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Runtime configuration, constructed once in `main` and passed by
/// reference to everything that needs paths. There is no process-wide
/// config global.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    /// Custom base directory for the database and key files. Defaults to
    /// the OS per-user data directory.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Story points assigned when none are given. Default: 1
    #[serde(default = "default_story_points")]
    pub default_story_points: i64,
}

fn default_story_points() -> i64 {
    1
}

/// Returns the default tudu data directory inside the OS per-user data
/// directory (e.g. `~/.local/share/tudu` on Linux).
pub fn default_data_dir() -> Result<PathBuf> {
    let data = dirs::data_dir().context("could not determine user data directory")?;
    Ok(data.join("tudu"))
}

impl Config {
    /// Load config from `<data-dir>/config.toml`, falling back to
    /// defaults when the file does not exist.
    pub fn load() -> Result<Config> {
        let path = default_data_dir()?.join("config.toml");
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// The resolved data directory (config override or OS default).
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_data_dir(),
        }
    }

    /// Returns the path to the `SQLite` database
    pub fn db_path(&self) -> Result<PathBuf> {
        Ok(self.data_dir()?.join("tudu.db"))
    }

    /// Ensure the data directory exists (idempotent)
    pub fn ensure_dirs(&self) -> Result<()> {
        let dir = self.data_dir()?;
        fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
        Ok(())
    }
}
