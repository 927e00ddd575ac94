//! Contract with the remote tabular-storage service.
//!
//! Everything behind these traits — OAuth, request plumbing, retry policy —
//! belongs to the concrete implementation, not to this crate. A [`Session`]
//! is constructed once (typically from a [`TokenSource`]) and passed into the
//! merge/backup entry points explicitly; there is no hidden cached session
//! state.
//!
//! # Worksheet handle semantics
//!
//! A [`Worksheet`] handle materializes its header and populated rows when it
//! is obtained from [`Document::worksheet`]. Reads are infallible over that
//! snapshot; appends and cell updates are buffered in the handle and only hit
//! the remote store on [`Worksheet::save`] — the sole fallible row operation.

use crate::error::StoreError;
use crate::types::{CollectionUrl, DocumentKey, Row};

/// Provider of an opaque access token a session is built from.
///
/// Renewal policy is the implementor's concern.
pub trait TokenSource {
    fn access_token(&self) -> Result<String, StoreError>;
}

/// A fixed, pre-issued token. Suitable for tests and short-lived jobs.
#[derive(Debug, Clone)]
pub struct StaticTokenSource {
    token: String,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl TokenSource for StaticTokenSource {
    fn access_token(&self) -> Result<String, StoreError> {
        Ok(self.token.clone())
    }
}

/// An authenticated view of the remote store.
pub trait Session {
    type Doc: Document;
    type Coll: Collection<Doc = Self::Doc>;

    /// Resolve a document by its opaque key.
    fn document_by_key(&self, key: &DocumentKey) -> Result<Self::Doc, StoreError>;

    /// Resolve a collection (folder) by URL.
    fn collection_by_url(&self, url: &CollectionUrl) -> Result<Self::Coll, StoreError>;
}

/// A remote spreadsheet document.
pub trait Document: Sized {
    type Ws: Worksheet;

    fn key(&self) -> &DocumentKey;

    fn title(&self) -> &str;

    /// Load the worksheet with this title, materializing its contents.
    fn worksheet(&self, title: &str) -> Result<Self::Ws, StoreError>;

    /// Server-side copy of the whole document under a new key.
    fn duplicate(&self, new_title: &str) -> Result<Self, StoreError>;
}

/// A single worksheet within a document.
pub trait Worksheet {
    fn title(&self) -> &str;

    /// Ordered column names; may contain blank slots.
    fn header(&self) -> &[String];

    /// Rows with at least one non-empty cell, in sheet order.
    fn populated_rows(&self) -> &[Row];

    /// Mutable view of the populated rows; edits are buffered until `save`.
    fn populated_rows_mut(&mut self) -> &mut [Row];

    /// Append a blank row and return a handle for filling its cells.
    ///
    /// `at_offset` is a 1-based insertion position among the populated rows;
    /// `None` (or a position past the end) appends at the end.
    fn append_row(&mut self, at_offset: Option<usize>) -> &mut Row;

    /// Flush buffered row changes to the remote store.
    fn save(&mut self) -> Result<(), StoreError>;
}

/// A folder-like container of documents.
pub trait Collection: Sized {
    type Doc: Document;

    fn url(&self) -> &CollectionUrl;

    /// Create (or reuse) a titled sub-collection.
    fn create_subcollection(&self, title: &str) -> Result<Self, StoreError>;

    fn add(&mut self, doc: &Self::Doc) -> Result<(), StoreError>;

    fn remove(&mut self, doc: &Self::Doc) -> Result<(), StoreError>;

    /// Delete the collection and everything added to it.
    fn delete(self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_token_source_hands_back_its_token() {
        let source = StaticTokenSource::new("ya29.test");
        assert_eq!(source.access_token().expect("token"), "ya29.test");
    }
}
