//! Layered configuration for the `pandora` binary.
//!
//! Layers, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. `<config dir>/pandora/pandora.toml` (see [`dirs::config_dir`])
//! 3. `./pandora.toml`
//! 4. environment (`PANDORA_DB`, `PANDORA_LOG`; `.env` is loaded first)
//! 5. command-line flags
//!
//! `--config <file>` replaces layers 2 and 3 with that one file, which must
//! exist.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

/// File name searched for in the config directory and the working directory.
pub const CONFIG_FILE: &str = "pandora.toml";

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PandoraConfig {
    pub db_path: PathBuf,
    pub lock_timeout: Duration,
    pub log_level: String,
}

impl Default for PandoraConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("pandora.db"),
            lock_timeout: pandora_store::DEFAULT_LOCK_TIMEOUT,
            log_level: "info".to_string(),
        }
    }
}

/// Values given on the command line; `None` leaves lower layers alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub db: Option<PathBuf>,
    pub log_level: Option<String>,
}

// ── file layer ───────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    database: DatabaseSection,
    log: LogSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DatabaseSection {
    path: Option<PathBuf>,
    lock_timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LogSection {
    level: Option<String>,
}

impl PandoraConfig {
    /// Resolve every layer against the real environment and filesystem.
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let mut config = Self::default();

        match &overrides.config {
            Some(path) => config.merge_file(path)?,
            None => {
                if let Some(dir) = dirs::config_dir() {
                    config.merge_file_if_exists(&dir.join("pandora").join(CONFIG_FILE))?;
                }
                config.merge_file_if_exists(Path::new(CONFIG_FILE))?;
            }
        }

        config.merge_env(|key| std::env::var(key).ok());
        config.merge_overrides(overrides);
        Ok(config)
    }

    fn merge_file_if_exists(&mut self, path: &Path) -> Result<()> {
        if path.is_file() {
            self.merge_file(path)?;
        }
        Ok(())
    }

    fn merge_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        self.merge_toml(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        debug!(path = %path.display(), "config file loaded");
        Ok(())
    }

    fn merge_toml(&mut self, content: &str) -> Result<()> {
        let file: FileConfig = toml::from_str(content)?;
        if let Some(path) = file.database.path {
            self.db_path = path;
        }
        if let Some(ms) = file.database.lock_timeout_ms {
            self.lock_timeout = Duration::from_millis(ms);
        }
        if let Some(level) = file.log.level {
            self.log_level = level;
        }
        Ok(())
    }

    fn merge_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("PANDORA_DB").filter(|v| !v.is_empty()) {
            self.db_path = PathBuf::from(path);
        }
        if let Some(level) = var("PANDORA_LOG").filter(|v| !v.is_empty()) {
            self.log_level = level;
        }
    }

    fn merge_overrides(&mut self, overrides: &Overrides) {
        if let Some(path) = &overrides.db {
            self.db_path = path.clone();
        }
        if let Some(level) = &overrides.log_level {
            self.log_level = level.clone();
        }
    }
}
