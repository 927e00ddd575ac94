//! Typed view over the routing worksheet.
//!
//! The index worksheet maps a logical sheetname to the document key currently
//! holding that sheet. Sheetnames are expected unique per index; keys may
//! repeat (several sheets can live in one document).

use std::collections::HashSet;

use crate::error::IndexError;
use crate::store::Worksheet;
use crate::types::{DocumentKey, SheetName};

/// Column naming the logical sheet an index row routes.
pub const SHEETNAME_COLUMN: &str = "sheetname";
/// Column holding the key of the document a sheet currently lives in.
pub const KEY_COLUMN: &str = "key";

/// One routing row: sheetname → document key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexEntry {
    pub sheetname: SheetName,
    pub key: DocumentKey,
}

/// In-memory snapshot of an index worksheet's populated rows.
///
/// Transient: materialized per operation and discarded after. Rewrites go
/// through [`rewrite_key`] against the worksheet handle, not this view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexTable {
    entries: Vec<IndexEntry>,
}

impl IndexTable {
    /// Snapshot the populated rows of an index worksheet, in row order.
    pub fn from_worksheet<W: Worksheet>(ws: &W) -> Self {
        let entries = ws
            .populated_rows()
            .iter()
            .map(|row| IndexEntry {
                sheetname: SheetName::from(row.get(SHEETNAME_COLUMN)),
                key: DocumentKey::from(row.get(KEY_COLUMN)),
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The document key a sheetname currently resolves to.
    ///
    /// `NotFound` if no row matches, `Duplicate` if more than one does.
    pub fn resolve(&self, sheetname: &SheetName) -> Result<&DocumentKey, IndexError> {
        let mut matches = self.entries.iter().filter(|e| &e.sheetname == sheetname);
        let first = matches.next().ok_or_else(|| IndexError::NotFound {
            sheetname: sheetname.clone(),
        })?;
        let extra = matches.count();
        if extra > 0 {
            return Err(IndexError::Duplicate {
                sheetname: sheetname.clone(),
                count: extra + 1,
            });
        }
        Ok(&first.key)
    }

    /// Distinct non-empty keys, in first-appearance order.
    ///
    /// Drives the set of documents a backup must duplicate.
    pub fn unique_keys(&self) -> Vec<DocumentKey> {
        let mut seen = HashSet::new();
        let mut keys = Vec::new();
        for entry in &self.entries {
            if entry.key.0.is_empty() {
                continue;
            }
            if seen.insert(entry.key.clone()) {
                keys.push(entry.key.clone());
            }
        }
        keys
    }

    /// Sheetnames in row order (duplicates included).
    pub fn sheetnames(&self) -> impl Iterator<Item = &SheetName> {
        self.entries.iter().map(|e| &e.sheetname)
    }
}

/// Set `key` to `new` on every populated row whose `key` equals `old`.
///
/// Edits stay buffered in the worksheet handle; the caller saves. Returns the
/// number of rows rewritten.
pub fn rewrite_key<W: Worksheet>(ws: &mut W, old: &DocumentKey, new: &DocumentKey) -> usize {
    let mut rewritten = 0;
    for row in ws.populated_rows_mut() {
        if row.get(KEY_COLUMN) == old.0.as_str() {
            row.set(KEY_COLUMN, new.0.as_str());
            rewritten += 1;
        }
    }
    rewritten
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
