//! Operator configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.sheetmaster/
//!   config.yaml
//! ```
//!
//! # API pattern
//!
//! Every function touching the filesystem has two forms:
//! - `fn_at(home: &Path, …)` — explicit home; used in tests with `TempDir`
//! - `fn(…)` — derives home from `dirs::home_dir()`, delegates to `_at`
//!
//! Tests must NEVER call the no-arg wrappers; always use `_at`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default title of the routing worksheet inside an index document.
pub const INDEX_WS_TITLE_DEFAULT: &str = "table_map";

const SAVE_EVERY_DEFAULT: usize = 10;
const BACKUP_COLLECTION_NAME_DEFAULT: &str = "backup";

/// Settings shared by the merge and backup entry points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MasterConfig {
    /// Title of the index worksheet within an index document.
    #[serde(default = "default_index_ws_title")]
    pub index_ws_title: String,

    /// 1-based insertion position for the first merged row; `0` appends.
    #[serde(default)]
    pub row_offset: usize,

    /// Persist the base worksheet after this many copied rows; `0` means
    /// only the final save.
    #[serde(default = "default_save_every")]
    pub save_every: usize,

    /// Name prefix for backup sub-collections.
    #[serde(default = "default_backup_collection_name")]
    pub backup_collection_name: String,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            index_ws_title: default_index_ws_title(),
            row_offset: 0,
            save_every: default_save_every(),
            backup_collection_name: default_backup_collection_name(),
        }
    }
}

fn default_index_ws_title() -> String {
    INDEX_WS_TITLE_DEFAULT.to_owned()
}

fn default_save_every() -> usize {
    SAVE_EVERY_DEFAULT
}

fn default_backup_collection_name() -> String {
    BACKUP_COLLECTION_NAME_DEFAULT.to_owned()
}

/// `<home>/.sheetmaster/config.yaml` — pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".sheetmaster").join("config.yaml")
}

/// Load the config, or defaults if the file does not exist.
///
/// Returns `ConfigError::Parse` (with path + line context) on malformed YAML.
pub fn load_at(home: &Path) -> Result<MasterConfig, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(MasterConfig::default());
    }
    let contents = std::fs::read_to_string(&path)?;
    serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<MasterConfig, ConfigError> {
    load_at(&home()?)
}

/// Atomically save the config.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `rename`. The `.tmp` stays
/// in the target directory (same filesystem — no EXDEV).
pub fn save_at(home: &Path, config: &MasterConfig) -> Result<(), ConfigError> {
    let path = config_path_at(home);
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let yaml = serde_yaml::to_string(config)?;
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, yaml)?;
    std::fs::rename(&tmp, &path)?;
    Ok(())
}

/// `save_at` convenience wrapper.
pub fn save(config: &MasterConfig) -> Result<(), ConfigError> {
    save_at(&home()?, config)
}

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
