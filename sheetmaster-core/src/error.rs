//! Error types for sheetmaster-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{CollectionUrl, DocumentKey, SheetName};

/// Failures surfaced by the remote tabular-storage collaborator.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No document exists under the given key.
    #[error("document not found: {key}")]
    DocumentNotFound { key: DocumentKey },

    /// The document exists but has no worksheet with this title.
    #[error("worksheet '{title}' not found in document {key}")]
    WorksheetNotFound { key: DocumentKey, title: String },

    /// No collection exists at the given URL.
    #[error("collection not found at {url}")]
    CollectionNotFound { url: CollectionUrl },

    /// Request-level failure (transport, conflict on save, quota).
    #[error("remote request failed: {message}")]
    Transport { message: String },
}

/// Failures resolving rows of an index table.
#[derive(Debug, Error)]
pub enum IndexError {
    /// No index row carries this sheetname.
    #[error("index has no row for sheetname '{sheetname}'")]
    NotFound { sheetname: SheetName },

    /// Sheetnames must be unique within an index; this one is not.
    #[error("sheetname '{sheetname}' appears {count} times in index")]
    Duplicate { sheetname: SheetName, count: usize },
}

/// All errors that can arise from configuration handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load — includes file path and line context from serde_yaml.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None` — cannot locate `~/.sheetmaster/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}
