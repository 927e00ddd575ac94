//! Point-in-time duplication of an index-tracked document set.
//!
//! ## State machine
//!
//! ```text
//! START → DUPLICATE_INDEX → DUPLICATE_DOCUMENTS → VERIFY → {COMMIT | ROLLBACK}
//! ```
//!
//! START resolves the destination collection and creates a timestamped
//! sub-collection, so a re-run never collides with a prior partial attempt.
//! VERIFY requires the rewritten backup index to reference none of the
//! original documents; on any stale key — or any store error along the way —
//! the sub-collection is deleted best-effort and the error surfaces.

use chrono::Utc;

use sheetmaster_core::config::MasterConfig;
use sheetmaster_core::index::{self, IndexTable};
use sheetmaster_core::store::{Collection, Document, Session, Worksheet};
use sheetmaster_core::types::{CollectionUrl, DocumentKey};

use crate::error::SyncError;

/// A committed backup: the destination sub-collection and the rewritten
/// index routing into it.
#[derive(Debug)]
pub struct BackupOutcome<C: Collection> {
    /// Sub-collection holding the duplicated documents.
    pub collection: C,
    /// Key of the duplicated index document; usable as a merge target.
    pub backup_index_key: DocumentKey,
    /// Original key → duplicate key, in duplication order.
    pub key_map: Vec<(DocumentKey, DocumentKey)>,
    /// Backup-index rows repointed at duplicates.
    pub rewritten: usize,
}

/// Duplicate the document set routed by `index_key` into a fresh
/// sub-collection of the collection at `collection_url`.
///
/// All-or-nothing: on verification failure or a store error mid-way, the
/// sub-collection (and with it every duplicate added so far) is deleted
/// best-effort before the error is returned. A failed rollback is logged,
/// not masked — the original error still surfaces.
pub fn backup<S: Session>(
    session: &S,
    cfg: &MasterConfig,
    index_key: &DocumentKey,
    collection_url: &CollectionUrl,
) -> Result<BackupOutcome<S::Coll>, SyncError> {
    let base_collection = session.collection_by_url(collection_url)?;
    let name = subcollection_name(&cfg.backup_collection_name);
    let mut dest = base_collection.create_subcollection(&name)?;
    tracing::info!("backup destination: {}", dest.url());

    match duplicate_set(session, cfg, index_key, &mut dest) {
        Ok((backup_index_key, key_map, rewritten)) => {
            tracing::info!(
                "backup committed: {} document(s) duplicated, {} index row(s) repointed",
                key_map.len() + 1,
                rewritten
            );
            Ok(BackupOutcome {
                collection: dest,
                backup_index_key,
                key_map,
                rewritten,
            })
        }
        Err(err) => {
            tracing::warn!("backup '{name}' failed, rolling back: {err}");
            if let Err(rollback_err) = dest.delete() {
                tracing::warn!("rollback of '{name}' failed: {rollback_err}");
            }
            Err(err)
        }
    }
}

/// `<prefix>-<UTC timestamp>`, unique per attempt.
fn subcollection_name(prefix: &str) -> String {
    format!("{prefix}-{}", Utc::now().format("%Y%m%dT%H%M%S%.6fZ"))
}

/// DUPLICATE_INDEX through COMMIT. Rollback stays with the caller.
fn duplicate_set<S: Session>(
    session: &S,
    cfg: &MasterConfig,
    index_key: &DocumentKey,
    dest: &mut S::Coll,
) -> Result<(DocumentKey, Vec<(DocumentKey, DocumentKey)>, usize), SyncError> {
    let base_index_doc = session.document_by_key(index_key)?;
    let base_index_ws = base_index_doc.worksheet(&cfg.index_ws_title)?;
    let original = IndexTable::from_worksheet(&base_index_ws);
    let original_keys = original.unique_keys();

    let backup_index_doc = base_index_doc.duplicate(base_index_doc.title())?;
    dest.add(&backup_index_doc)?;
    let mut backup_index_ws = backup_index_doc.worksheet(&cfg.index_ws_title)?;
    tracing::debug!("duplicated index {index_key} -> {}", backup_index_doc.key());

    let mut key_map = Vec::with_capacity(original_keys.len());
    let mut rewritten = 0;
    for key in &original_keys {
        let doc = session.document_by_key(key)?;
        let duplicate = doc.duplicate(doc.title())?;
        dest.add(&duplicate)?;
        rewritten += index::rewrite_key(&mut backup_index_ws, key, duplicate.key());
        tracing::debug!("duplicated {key} -> {}", duplicate.key());
        key_map.push((key.clone(), duplicate.key().clone()));
    }

    // VERIFY runs on the buffered rewrite, before anything is persisted.
    let rewritten_table = IndexTable::from_worksheet(&backup_index_ws);
    let stale_keys: Vec<DocumentKey> = rewritten_table
        .unique_keys()
        .into_iter()
        .filter(|key| original_keys.contains(key))
        .collect();
    if !stale_keys.is_empty() {
        return Err(SyncError::BackupInconsistency { stale_keys });
    }

    backup_index_ws.save()?;
    Ok((backup_index_doc.key().clone(), key_map, rewritten))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subcollection_names_carry_the_prefix() {
        let name = subcollection_name("backup");
        assert!(name.starts_with("backup-"), "got: {name}");
        assert!(name.ends_with('Z'));
    }

    #[test]
    fn consecutive_names_differ() {
        let first = subcollection_name("backup");
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = subcollection_name("backup");
        assert_ne!(first, second);
    }
}
