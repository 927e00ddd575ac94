//! Domain types for the sheetmaster data model.
//!
//! Identifiers are string newtypes, never bare `String`s at API boundaries.
//! A [`Row`] is an explicit column-name → cell-value mapping; cell values are
//! always strings, exactly as the remote store hands them over.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Column holding a row's per-sheet identity.
pub const ID_COLUMN: &str = "id";

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Logical name of a sheet, as routed through the index table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SheetName(pub String);

impl fmt::Display for SheetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for SheetName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SheetName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Opaque key identifying a document in the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentKey(pub String);

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for DocumentKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DocumentKey {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// URL addressing a collection (folder) of documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CollectionUrl(pub String);

impl fmt::Display for CollectionUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for CollectionUrl {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CollectionUrl {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Row
// ---------------------------------------------------------------------------

/// A single worksheet row, addressed by column name.
///
/// Absent columns read as the empty string — the remote store does not
/// distinguish a missing cell from a blank one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    cells: HashMap<String, String>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from `(column, value)` pairs.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let cells = pairs
            .into_iter()
            .map(|(column, value)| (column.to_owned(), value.to_owned()))
            .collect();
        Self { cells }
    }

    /// Cell value for `column`; empty string if the column is absent.
    pub fn get(&self, column: &str) -> &str {
        self.cells.get(column).map(String::as_str).unwrap_or_default()
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.cells.insert(column.into(), value.into());
    }

    /// Shorthand for the [`ID_COLUMN`] cell.
    pub fn id(&self) -> &str {
        self.get(ID_COLUMN)
    }

    /// True if at least one cell is non-empty.
    pub fn is_populated(&self) -> bool {
        self.cells.values().any(|value| !value.is_empty())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
