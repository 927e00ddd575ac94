//! Row merger and merge orchestration.
//!
//! ## Two-pass batch protocol
//!
//! 1. CHECK every candidate sheet: resolve its index row on both sides, load
//!    both worksheets, validate header compatibility and id uniqueness.
//! 2. APPLY row merges, only for sheets that passed the check pass.
//!
//! The barrier between the passes means one bad sheet never leaves later
//! sheets unchecked while earlier ones are already half-applied. A sheet that
//! fails CHECK is logged and skipped; the batch continues.

use std::collections::HashSet;

use sheetmaster_core::config::MasterConfig;
use sheetmaster_core::index::IndexTable;
use sheetmaster_core::store::{Document, Session, Worksheet};
use sheetmaster_core::types::{DocumentKey, SheetName};

use crate::error::{index_err, IndexSide, SyncError};
use crate::validate::{find_id_collision, same_header};

/// Worksheet type reachable through a session's documents.
pub(crate) type WsOf<S> = <<S as Session>::Doc as Document>::Ws;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Row counts from a single [`merge_rows`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowMergeStats {
    /// Rows copied into the base worksheet.
    pub appended: usize,
    /// Diff rows left out for lacking an id.
    pub skipped: usize,
}

/// One successfully merged sheet.
#[derive(Debug)]
pub struct SheetMergeResult {
    pub sheetname: SheetName,
    pub stats: RowMergeStats,
}

/// A sheet the batch could not merge, with the reason.
#[derive(Debug)]
pub struct SheetIssue {
    pub sheetname: SheetName,
    pub reason: SyncError,
}

/// Outcome of a merge batch.
#[derive(Debug, Default)]
pub struct MergeReport {
    /// Sheets merged during the apply pass.
    pub merged: Vec<SheetMergeResult>,
    /// Sheets rejected during the check pass; storage untouched.
    pub skipped: Vec<SheetIssue>,
    /// Sheets whose apply failed mid-flight; rows saved before the failure
    /// remain in the base worksheet.
    pub failed: Vec<SheetIssue>,
}

// ---------------------------------------------------------------------------
// Row merger
// ---------------------------------------------------------------------------

/// Copy the diff worksheet's identified rows into the base worksheet.
///
/// Diff rows without an id are not merge candidates and are skipped. The
/// first copied row honors `offset` (a 1-based insertion position; `0`
/// appends); every later row goes to the end. Cell values pass through
/// verbatim for every non-blank header column. The base worksheet is saved
/// after every `save_every`-th copied row and once more at the end, bounding
/// how much work a mid-merge failure can lose — not providing atomicity.
///
/// Precondition: the two worksheets share a header (see
/// [`crate::validate::same_header`]) and their id sets do not collide.
/// Enforcing that is the caller's job; this function only copies.
pub fn merge_rows<B: Worksheet, D: Worksheet>(
    base: &mut B,
    diff: &D,
    offset: usize,
    save_every: usize,
) -> Result<RowMergeStats, SyncError> {
    let columns: Vec<String> = diff
        .header()
        .iter()
        .filter(|c| !c.is_empty())
        .cloned()
        .collect();
    let diff_rows = diff.populated_rows().to_vec();

    let mut stats = RowMergeStats::default();
    for diff_row in &diff_rows {
        if diff_row.id().is_empty() {
            stats.skipped += 1;
            continue;
        }

        let at = if stats.appended == 0 && offset > 0 {
            Some(offset)
        } else {
            None
        };
        let row = base.append_row(at);
        for column in &columns {
            row.set(column.as_str(), diff_row.get(column));
        }

        stats.appended += 1;
        if save_every > 0 && stats.appended % save_every == 0 {
            tracing::debug!("interim save after {} row(s)", stats.appended);
            base.save()?;
        }
    }

    base.save()?;
    Ok(stats)
}

// ---------------------------------------------------------------------------
// Check pass
// ---------------------------------------------------------------------------

struct MergeJob<W: Worksheet> {
    sheetname: SheetName,
    base: W,
    diff: W,
}

/// Validate one sheet end to end without touching storage.
fn check_sheet<S: Session>(
    session: &S,
    sheetname: &SheetName,
    base_index: &IndexTable,
    diff_index: &IndexTable,
) -> Result<MergeJob<WsOf<S>>, SyncError> {
    let base_key = base_index
        .resolve(sheetname)
        .map_err(|e| index_err(IndexSide::Base, e))?;
    let diff_key = diff_index
        .resolve(sheetname)
        .map_err(|e| index_err(IndexSide::Diff, e))?;
    if base_key == diff_key {
        return Err(SyncError::SameKey {
            sheetname: sheetname.clone(),
            key: base_key.clone(),
        });
    }

    let base_ws = session.document_by_key(base_key)?.worksheet(&sheetname.0)?;
    let diff_ws = session.document_by_key(diff_key)?.worksheet(&sheetname.0)?;

    if !same_header(&diff_ws, &base_ws, false) {
        return Err(SyncError::HeaderMismatch {
            sheetname: sheetname.clone(),
        });
    }
    if let Some(id) = find_id_collision(base_ws.populated_rows(), diff_ws.populated_rows()) {
        return Err(SyncError::IdCollision {
            sheetname: sheetname.clone(),
            id,
        });
    }

    Ok(MergeJob {
        sheetname: sheetname.clone(),
        base: base_ws,
        diff: diff_ws,
    })
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

fn run_batch<S: Session>(
    session: &S,
    cfg: &MasterConfig,
    base_index: &IndexTable,
    diff_index: &IndexTable,
    candidates: Vec<SheetName>,
) -> MergeReport {
    let mut jobs = Vec::new();
    let mut report = MergeReport::default();

    for sheetname in candidates {
        match check_sheet(session, &sheetname, base_index, diff_index) {
            Ok(job) => jobs.push(job),
            Err(reason) => {
                tracing::warn!("skipping sheet '{sheetname}': {reason}");
                report.skipped.push(SheetIssue { sheetname, reason });
            }
        }
    }

    for job in jobs {
        let MergeJob {
            sheetname,
            mut base,
            diff,
        } = job;
        match merge_rows(&mut base, &diff, cfg.row_offset, cfg.save_every) {
            Ok(stats) => {
                tracing::info!(
                    "merged sheet '{sheetname}': {} appended, {} without id",
                    stats.appended,
                    stats.skipped
                );
                report.merged.push(SheetMergeResult { sheetname, stats });
            }
            Err(reason) => {
                tracing::warn!("merge of sheet '{sheetname}' failed mid-apply: {reason}");
                report.failed.push(SheetIssue { sheetname, reason });
            }
        }
    }

    report
}

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Merge a single named sheet from the diff set into the base set.
pub fn merge_sheet<S: Session>(
    session: &S,
    cfg: &MasterConfig,
    base_index_key: &DocumentKey,
    diff_index_key: &DocumentKey,
    sheetname: &SheetName,
) -> Result<MergeReport, SyncError> {
    let base_index = load_index(session, cfg, base_index_key)?;
    let diff_index = load_index(session, cfg, diff_index_key)?;
    Ok(run_batch(
        session,
        cfg,
        &base_index,
        &diff_index,
        vec![sheetname.clone()],
    ))
}

/// Merge every sheet named by the diff index into the base set.
///
/// Sheets routed to the same document on both sides are skipped, not failed.
pub fn merge_all<S: Session>(
    session: &S,
    cfg: &MasterConfig,
    base_index_key: &DocumentKey,
    diff_index_key: &DocumentKey,
) -> Result<MergeReport, SyncError> {
    let base_index = load_index(session, cfg, base_index_key)?;
    let diff_index = load_index(session, cfg, diff_index_key)?;

    let mut seen = HashSet::new();
    let candidates: Vec<SheetName> = diff_index
        .sheetnames()
        .filter(|name| !name.0.is_empty())
        .filter(|name| seen.insert((*name).clone()))
        .cloned()
        .collect();
    tracing::debug!("{} merge candidate(s) in diff index", candidates.len());

    Ok(run_batch(
        session,
        cfg,
        &base_index,
        &diff_index,
        candidates,
    ))
}

/// Materialize the index table routed by an index document.
pub(crate) fn load_index<S: Session>(
    session: &S,
    cfg: &MasterConfig,
    index_key: &DocumentKey,
) -> Result<IndexTable, SyncError> {
    let doc = session.document_by_key(index_key)?;
    let ws = doc.worksheet(&cfg.index_ws_title)?;
    Ok(IndexTable::from_worksheet(&ws))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use sheetmaster_core::mem::{MemStore, MemWorksheet};
    use sheetmaster_core::store::{Document, Session};
    use sheetmaster_core::types::Row;

    use super::*;

    fn mem_ws(header: &[&str], rows: Vec<Row>) -> MemWorksheet {
        let store = MemStore::new();
        store.add_document("D", "doc");
        store.add_worksheet("D", "sheet", header, rows);
        store
            .session()
            .document_by_key(&DocumentKey::from("D"))
            .expect("doc")
            .worksheet("sheet")
            .expect("ws")
    }

    fn user_row(id: &str, name: &str) -> Row {
        Row::from_pairs([("id", id), ("name", name)])
    }

    fn ids(ws: &MemWorksheet) -> Vec<String> {
        ws.populated_rows().iter().map(|r| r.id().to_owned()).collect()
    }

    #[test]
    fn appends_in_diff_order() {
        let mut base = mem_ws(&["id", "name"], vec![user_row("0", "seed")]);
        let diff = mem_ws(
            &["id", "name"],
            vec![user_row("1", "a"), user_row("2", "b"), user_row("3", "c")],
        );

        let stats = merge_rows(&mut base, &diff, 0, 0).expect("merge");
        assert_eq!(stats.appended, 3);
        assert_eq!(ids(&base), vec!["0", "1", "2", "3"]);
    }

    #[test]
    fn offset_places_first_row_then_appends_rest() {
        let mut base = mem_ws(
            &["id", "name"],
            vec![user_row("a", "x"), user_row("b", "y")],
        );
        let diff = mem_ws(
            &["id", "name"],
            vec![user_row("1", "p"), user_row("2", "q"), user_row("3", "r")],
        );

        merge_rows(&mut base, &diff, 2, 0).expect("merge");
        assert_eq!(ids(&base), vec!["a", "1", "b", "2", "3"]);
    }

    #[test]
    fn rows_without_id_are_not_candidates() {
        let mut base = mem_ws(&["id", "name"], vec![]);
        let diff = mem_ws(
            &["id", "name"],
            vec![user_row("", "ghost"), user_row("x", "real")],
        );

        let stats = merge_rows(&mut base, &diff, 0, 0).expect("merge");
        assert_eq!(stats.appended, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(ids(&base), vec!["x"]);
    }

    #[test]
    fn blank_header_columns_are_not_copied() {
        let mut base = mem_ws(&["id", "", "name"], vec![]);
        let diff = mem_ws(
            &["id", "", "name"],
            vec![Row::from_pairs([("id", "1"), ("", "junk"), ("name", "x")])],
        );

        merge_rows(&mut base, &diff, 0, 0).expect("merge");
        let copied = &base.populated_rows()[0];
        assert_eq!(copied.get("name"), "x");
        assert_eq!(copied.get(""), "");
    }

    #[test]
    fn cell_values_pass_through_verbatim() {
        let mut base = mem_ws(&["id", "name"], vec![]);
        let diff = mem_ws(
            &["id", "name"],
            vec![user_row("1", "'quoted"), user_row("2", "00042")],
        );

        merge_rows(&mut base, &diff, 0, 0).expect("merge");
        assert_eq!(base.populated_rows()[0].get("name"), "'quoted");
        assert_eq!(base.populated_rows()[1].get("name"), "00042");
    }

    #[test]
    fn save_every_batches_interim_saves() {
        let mut base = mem_ws(&["id", "name"], vec![]);
        let diff = mem_ws(
            &["id", "name"],
            (1..=5)
                .map(|i| user_row(&i.to_string(), "n"))
                .collect(),
        );

        merge_rows(&mut base, &diff, 0, 2).expect("merge");
        // After rows 2 and 4, plus the unconditional final save.
        assert_eq!(base.save_calls(), 3);
    }

    #[test]
    fn save_every_zero_saves_exactly_once() {
        let mut base = mem_ws(&["id", "name"], vec![]);
        let diff = mem_ws(&["id", "name"], vec![user_row("1", "a")]);

        merge_rows(&mut base, &diff, 0, 0).expect("merge");
        assert_eq!(base.save_calls(), 1);
    }

    #[test]
    fn empty_diff_still_saves_base() {
        let mut base = mem_ws(&["id", "name"], vec![]);
        let diff = mem_ws(&["id", "name"], vec![]);

        let stats = merge_rows(&mut base, &diff, 0, 10).expect("merge");
        assert_eq!(stats, RowMergeStats::default());
        assert_eq!(base.save_calls(), 1);
    }
}
