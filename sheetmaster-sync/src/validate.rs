//! Merge-eligibility checks: header compatibility and id uniqueness.
//!
//! Both checks are pure over snapshots already read into memory and MUST run
//! before any row is appended — appends are not reversible short of a full
//! document restore.

use std::collections::HashSet;

use sheetmaster_core::store::Worksheet;
use sheetmaster_core::types::Row;

/// Structural compatibility of two worksheets.
///
/// Compares the header sequences element for element, order included. With
/// `ignore_blank`, blank column slots are filtered from both sides first;
/// otherwise a blank-slot difference is a mismatch like any other. This is
/// the sole gate for merge eligibility.
pub fn same_header<W: Worksheet>(a: &W, b: &W, ignore_blank: bool) -> bool {
    same_columns(a.header(), b.header(), ignore_blank)
}

/// [`same_header`] over raw column-name sequences.
pub fn same_columns(a: &[String], b: &[String], ignore_blank: bool) -> bool {
    if ignore_blank {
        let left = a.iter().filter(|c| !c.is_empty());
        let right = b.iter().filter(|c| !c.is_empty());
        left.eq(right)
    } else {
        a == b
    }
}

/// First id value present more than once across the two row sets.
///
/// Rows with an empty id are not merge candidates and never collide, no
/// matter how often they repeat.
pub fn find_id_collision(base_rows: &[Row], diff_rows: &[Row]) -> Option<String> {
    let mut seen = HashSet::new();
    for row in base_rows.iter().chain(diff_rows) {
        let id = row.id();
        if id.is_empty() {
            continue;
        }
        if !seen.insert(id.to_owned()) {
            return Some(id.to_owned());
        }
    }
    None
}

/// True iff any non-empty id appears more than once across the two row sets.
pub fn has_id_collision(base_rows: &[Row], diff_rows: &[Row]) -> bool {
    find_id_collision(base_rows, diff_rows).is_some()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
