//! In-memory implementation of the store traits.
//!
//! Backs the test suites and lets callers rehearse a merge or backup without
//! a live backend. One [`MemStore`] owns all state; [`MemSession`] and the
//! document/collection/worksheet handles share it through `Rc<RefCell<…>>`,
//! mirroring the single-writer, blocking model of the real service.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::StoreError;
use crate::store::{Collection, Document, Session, Worksheet};
use crate::types::{CollectionUrl, DocumentKey, Row};

type Shared = Rc<RefCell<StoreState>>;

#[derive(Debug, Default)]
struct StoreState {
    docs: HashMap<DocumentKey, DocState>,
    collections: HashMap<String, CollState>,
    next_doc: u64,
}

#[derive(Debug, Clone, Default)]
struct DocState {
    title: String,
    worksheets: Vec<WsState>,
}

#[derive(Debug, Clone)]
struct WsState {
    title: String,
    header: Vec<String>,
    rows: Vec<Row>,
}

#[derive(Debug, Default)]
struct CollState {
    members: Vec<DocumentKey>,
}

// ---------------------------------------------------------------------------
// Store + fixtures
// ---------------------------------------------------------------------------

/// Shared in-memory store; cheap to clone, all clones see the same state.
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    state: Shared,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session. No credentials involved.
    pub fn session(&self) -> MemSession {
        MemSession {
            state: Rc::clone(&self.state),
        }
    }

    /// Register an empty document under an explicit key.
    pub fn add_document(&self, key: &str, title: &str) {
        self.state.borrow_mut().docs.insert(
            DocumentKey::from(key),
            DocState {
                title: title.to_owned(),
                worksheets: Vec::new(),
            },
        );
    }

    /// Attach a worksheet to a registered document.
    ///
    /// Rows are filtered to populated ones, as the real store reports them.
    pub fn add_worksheet(&self, key: &str, title: &str, header: &[&str], rows: Vec<Row>) {
        let mut state = self.state.borrow_mut();
        let doc = state
            .docs
            .get_mut(&DocumentKey::from(key))
            .unwrap_or_else(|| panic!("no document registered under key '{key}'"));
        doc.worksheets.push(WsState {
            title: title.to_owned(),
            header: header.iter().map(|c| (*c).to_owned()).collect(),
            rows: rows.into_iter().filter(Row::is_populated).collect(),
        });
    }

    /// Register an empty collection at a URL.
    pub fn add_collection(&self, url: &str) {
        self.state
            .borrow_mut()
            .collections
            .insert(url.to_owned(), CollState::default());
    }

    pub fn document_exists(&self, key: &DocumentKey) -> bool {
        self.state.borrow().docs.contains_key(key)
    }

    pub fn collection_exists(&self, url: &str) -> bool {
        self.state.borrow().collections.contains_key(url)
    }

    /// URLs of all registered collections, sorted.
    pub fn collection_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self.state.borrow().collections.keys().cloned().collect();
        urls.sort();
        urls
    }

    /// Keys of the documents a collection currently holds, in add order.
    pub fn collection_members(&self, url: &str) -> Vec<DocumentKey> {
        self.state
            .borrow()
            .collections
            .get(url)
            .map(|c| c.members.clone())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MemSession {
    state: Shared,
}

impl Session for MemSession {
    type Doc = MemDocument;
    type Coll = MemCollection;

    fn document_by_key(&self, key: &DocumentKey) -> Result<MemDocument, StoreError> {
        let state = self.state.borrow();
        let doc = state
            .docs
            .get(key)
            .ok_or_else(|| StoreError::DocumentNotFound { key: key.clone() })?;
        Ok(MemDocument {
            key: key.clone(),
            title: doc.title.clone(),
            state: Rc::clone(&self.state),
        })
    }

    fn collection_by_url(&self, url: &CollectionUrl) -> Result<MemCollection, StoreError> {
        if !self.state.borrow().collections.contains_key(&url.0) {
            return Err(StoreError::CollectionNotFound { url: url.clone() });
        }
        Ok(MemCollection {
            url: url.clone(),
            state: Rc::clone(&self.state),
        })
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MemDocument {
    key: DocumentKey,
    title: String,
    state: Shared,
}

impl Document for MemDocument {
    type Ws = MemWorksheet;

    fn key(&self) -> &DocumentKey {
        &self.key
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn worksheet(&self, title: &str) -> Result<MemWorksheet, StoreError> {
        let state = self.state.borrow();
        let doc = state
            .docs
            .get(&self.key)
            .ok_or_else(|| StoreError::DocumentNotFound {
                key: self.key.clone(),
            })?;
        let ws = doc
            .worksheets
            .iter()
            .find(|w| w.title == title)
            .ok_or_else(|| StoreError::WorksheetNotFound {
                key: self.key.clone(),
                title: title.to_owned(),
            })?;
        Ok(MemWorksheet {
            doc_key: self.key.clone(),
            title: ws.title.clone(),
            header: ws.header.clone(),
            rows: ws.rows.clone(),
            saves: 0,
            state: Rc::clone(&self.state),
        })
    }

    fn duplicate(&self, new_title: &str) -> Result<Self, StoreError> {
        let mut state = self.state.borrow_mut();
        let src = state
            .docs
            .get(&self.key)
            .cloned()
            .ok_or_else(|| StoreError::DocumentNotFound {
                key: self.key.clone(),
            })?;
        state.next_doc += 1;
        let key = DocumentKey::from(format!("mem-doc-{}", state.next_doc));
        state.docs.insert(
            key.clone(),
            DocState {
                title: new_title.to_owned(),
                worksheets: src.worksheets,
            },
        );
        Ok(MemDocument {
            key,
            title: new_title.to_owned(),
            state: Rc::clone(&self.state),
        })
    }
}

// ---------------------------------------------------------------------------
// Worksheet
// ---------------------------------------------------------------------------

/// Worksheet handle over a materialized snapshot; `save` writes back.
#[derive(Debug, Clone)]
pub struct MemWorksheet {
    doc_key: DocumentKey,
    title: String,
    header: Vec<String>,
    rows: Vec<Row>,
    saves: usize,
    state: Shared,
}

impl MemWorksheet {
    /// How many times this handle has been saved. Test instrumentation.
    pub fn save_calls(&self) -> usize {
        self.saves
    }
}

impl Worksheet for MemWorksheet {
    fn title(&self) -> &str {
        &self.title
    }

    fn header(&self) -> &[String] {
        &self.header
    }

    fn populated_rows(&self) -> &[Row] {
        &self.rows
    }

    fn populated_rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    fn append_row(&mut self, at_offset: Option<usize>) -> &mut Row {
        let idx = match at_offset {
            Some(pos) if pos > 0 => (pos - 1).min(self.rows.len()),
            _ => self.rows.len(),
        };
        self.rows.insert(idx, Row::new());
        &mut self.rows[idx]
    }

    fn save(&mut self) -> Result<(), StoreError> {
        self.saves += 1;
        let mut state = self.state.borrow_mut();
        let doc = state
            .docs
            .get_mut(&self.doc_key)
            .ok_or_else(|| StoreError::DocumentNotFound {
                key: self.doc_key.clone(),
            })?;
        let ws = doc
            .worksheets
            .iter_mut()
            .find(|w| w.title == self.title)
            .ok_or_else(|| StoreError::WorksheetNotFound {
                key: self.doc_key.clone(),
                title: self.title.clone(),
            })?;
        // Appended rows never filled in stay blank and drop out here.
        ws.rows = self.rows.iter().filter(|r| r.is_populated()).cloned().collect();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct MemCollection {
    url: CollectionUrl,
    state: Shared,
}

impl Collection for MemCollection {
    type Doc = MemDocument;

    fn url(&self) -> &CollectionUrl {
        &self.url
    }

    fn create_subcollection(&self, title: &str) -> Result<Self, StoreError> {
        let sub_url = format!("{}/{}", self.url.0, title);
        let mut state = self.state.borrow_mut();
        state.collections.entry(sub_url.clone()).or_default();
        Ok(MemCollection {
            url: CollectionUrl::from(sub_url),
            state: Rc::clone(&self.state),
        })
    }

    fn add(&mut self, doc: &MemDocument) -> Result<(), StoreError> {
        let mut state = self.state.borrow_mut();
        let coll = state
            .collections
            .get_mut(&self.url.0)
            .ok_or_else(|| StoreError::CollectionNotFound {
                url: self.url.clone(),
            })?;
        coll.members.push(doc.key.clone());
        Ok(())
    }

    fn remove(&mut self, doc: &MemDocument) -> Result<(), StoreError> {
        let mut state = self.state.borrow_mut();
        let coll = state
            .collections
            .get_mut(&self.url.0)
            .ok_or_else(|| StoreError::CollectionNotFound {
                url: self.url.clone(),
            })?;
        coll.members.retain(|k| k != &doc.key);
        Ok(())
    }

    fn delete(self) -> Result<(), StoreError> {
        let mut state = self.state.borrow_mut();
        let coll = state
            .collections
            .remove(&self.url.0)
            .ok_or_else(|| StoreError::CollectionNotFound {
                url: self.url.clone(),
            })?;
        for key in coll.members {
            state.docs.remove(&key);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
