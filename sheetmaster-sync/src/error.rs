//! Error types for sheetmaster-sync.

use std::fmt;

use thiserror::Error;

use sheetmaster_core::error::{IndexError, StoreError};
use sheetmaster_core::types::{DocumentKey, SheetName};

/// Which of the two index tables an index failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSide {
    Base,
    Diff,
}

impl fmt::Display for IndexSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexSide::Base => write!(f, "base"),
            IndexSide::Diff => write!(f, "diff"),
        }
    }
}

/// All errors that can arise from merge and backup operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the remote store collaborator.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An index row could not be resolved, annotated with the side.
    #[error("{side} index: {source}")]
    Index {
        side: IndexSide,
        #[source]
        source: IndexError,
    },

    /// Base and diff worksheets are structurally incompatible.
    #[error("header mismatch for sheet '{sheetname}'")]
    HeaderMismatch { sheetname: SheetName },

    /// The same non-empty row id exists on both sides.
    #[error("id '{id}' present in both base and diff rows of sheet '{sheetname}'")]
    IdCollision { sheetname: SheetName, id: String },

    /// Both indexes route the sheet to the same document; nothing to merge.
    #[error("sheet '{sheetname}' already lives in document {key} on both sides")]
    SameKey {
        sheetname: SheetName,
        key: DocumentKey,
    },

    /// Post-duplication verification found keys still pointing at originals.
    #[error("backup index still references original document(s): {}", join_keys(.stale_keys))]
    BackupInconsistency { stale_keys: Vec<DocumentKey> },
}

/// Convenience constructor for [`SyncError::Index`].
pub(crate) fn index_err(side: IndexSide, source: IndexError) -> SyncError {
    SyncError::Index { side, source }
}

fn join_keys(keys: &[DocumentKey]) -> String {
    keys.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
