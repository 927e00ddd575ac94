//! Shared entry points over the merge and backup orchestrations.

use sheetmaster_core::config::MasterConfig;
use sheetmaster_core::store::{Document, Session};
use sheetmaster_core::types::{CollectionUrl, DocumentKey, SheetName};

use crate::backup::{backup, BackupOutcome};
use crate::error::SyncError;
use crate::merge::{merge_all, merge_sheet, MergeReport};
use crate::validate::same_header;

/// Scope for a merge run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeScope {
    /// Merge every sheet named by the diff index.
    All,
    /// Merge a single named sheet.
    Sheet(SheetName),
}

/// Run a merge for a scope.
///
/// This is the canonical merge entrypoint; both index documents are read
/// through the configured index worksheet title.
pub fn run<S: Session>(
    session: &S,
    cfg: &MasterConfig,
    base_index_key: &DocumentKey,
    diff_index_key: &DocumentKey,
    scope: MergeScope,
) -> Result<MergeReport, SyncError> {
    match scope {
        MergeScope::All => merge_all(session, cfg, base_index_key, diff_index_key),
        MergeScope::Sheet(name) => {
            merge_sheet(session, cfg, base_index_key, diff_index_key, &name)
        }
    }
}

/// Back up the base set, then merge the diff set into the snapshot.
///
/// The live base documents are never written: the merge target is the backup
/// index, so the run rehearses a merge against a disposable duplicate.
pub fn rehearse<S: Session>(
    session: &S,
    cfg: &MasterConfig,
    base_index_key: &DocumentKey,
    diff_index_key: &DocumentKey,
    collection_url: &CollectionUrl,
    scope: MergeScope,
) -> Result<(BackupOutcome<S::Coll>, MergeReport), SyncError> {
    let outcome = backup(session, cfg, base_index_key, collection_url)?;
    tracing::info!(
        "rehearsing merge against snapshot index {}",
        outcome.backup_index_key
    );
    let report = run(session, cfg, &outcome.backup_index_key, diff_index_key, scope)?;
    Ok((outcome, report))
}

/// Compare the headers of the same-titled worksheet in two documents.
pub fn compare_headers<S: Session>(
    session: &S,
    title: &str,
    key_a: &DocumentKey,
    key_b: &DocumentKey,
    ignore_blank: bool,
) -> Result<bool, SyncError> {
    let a = session.document_by_key(key_a)?.worksheet(title)?;
    let b = session.document_by_key(key_b)?.worksheet(title)?;
    Ok(same_header(&a, &b, ignore_blank))
}
