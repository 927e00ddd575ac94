//! Backup duplication, verification, and rollback scenarios.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use sheetmaster_core::config::MasterConfig;
use sheetmaster_core::error::StoreError;
use sheetmaster_core::index::{IndexTable, KEY_COLUMN, SHEETNAME_COLUMN};
use sheetmaster_core::mem::MemStore;
use sheetmaster_core::store::{Collection, Document, Session, Worksheet};
use sheetmaster_core::types::{CollectionUrl, DocumentKey, Row, SheetName};
use sheetmaster_sync::{backup, SyncError};

const ROOT_URL: &str = "https://store/folders/root";

fn index_row(sheetname: &str, key: &str) -> Row {
    Row::from_pairs([(SHEETNAME_COLUMN, sheetname), (KEY_COLUMN, key)])
}

/// Index `IDX` routing three sheets across documents `B1` and `B2`.
fn seeded_store() -> MemStore {
    let store = MemStore::new();
    store.add_document("IDX", "index");
    store.add_worksheet(
        "IDX",
        "table_map",
        &[SHEETNAME_COLUMN, KEY_COLUMN],
        vec![
            index_row("users", "B1"),
            index_row("orders", "B2"),
            index_row("audit", "B1"),
        ],
    );
    store.add_document("B1", "first doc");
    store.add_worksheet("B1", "users", &["id"], vec![Row::from_pairs([("id", "1")])]);
    store.add_worksheet("B1", "audit", &["id"], vec![]);
    store.add_document("B2", "second doc");
    store.add_worksheet("B2", "orders", &["id"], vec![Row::from_pairs([("id", "o1")])]);
    store.add_collection(ROOT_URL);
    store
}

fn backup_index(store: &MemStore, key: &DocumentKey) -> IndexTable {
    let ws = store
        .session()
        .document_by_key(key)
        .expect("backup index doc")
        .worksheet("table_map")
        .expect("backup index ws");
    IndexTable::from_worksheet(&ws)
}

// ---------------------------------------------------------------------------
// 1. Commit path
// ---------------------------------------------------------------------------

#[test]
fn backup_duplicates_the_whole_set_and_repoints_the_index() {
    let store = seeded_store();
    let outcome = backup(
        &store.session(),
        &MasterConfig::default(),
        &DocumentKey::from("IDX"),
        &CollectionUrl::from(ROOT_URL),
    )
    .expect("backup");

    // Index duplicate plus one duplicate per distinct key.
    assert_eq!(outcome.key_map.len(), 2);
    assert_eq!(outcome.rewritten, 3);
    let members = store.collection_members(&outcome.collection.url().0);
    assert_eq!(members.len(), 3);
    assert!(members.contains(&outcome.backup_index_key));

    // Every backup-index key routes at a duplicate, none at an original.
    let originals: HashSet<DocumentKey> =
        [DocumentKey::from("B1"), DocumentKey::from("B2")].into();
    let index = backup_index(&store, &outcome.backup_index_key);
    let backup_keys = index.unique_keys();
    assert_eq!(backup_keys.len(), 2);
    assert!(backup_keys.iter().all(|k| !originals.contains(k)));
    assert!(backup_keys.iter().all(|k| store.document_exists(k)));

    // Sheets sharing a document keep sharing its duplicate.
    let users_key = index.resolve(&SheetName::from("users")).expect("users");
    let audit_key = index.resolve(&SheetName::from("audit")).expect("audit");
    let orders_key = index.resolve(&SheetName::from("orders")).expect("orders");
    assert_eq!(users_key, audit_key);
    assert_ne!(users_key, orders_key);

    // Duplicates carry the sheet contents.
    let users_ws = store
        .session()
        .document_by_key(users_key)
        .expect("dup doc")
        .worksheet("users")
        .expect("dup ws");
    assert_eq!(users_ws.populated_rows().len(), 1);

    // Originals are untouched.
    assert!(store.document_exists(&DocumentKey::from("B1")));
    assert!(store.document_exists(&DocumentKey::from("B2")));
}

#[test]
fn snapshot_index_is_usable_as_a_merge_target() {
    let store = seeded_store();
    let outcome = backup(
        &store.session(),
        &MasterConfig::default(),
        &DocumentKey::from("IDX"),
        &CollectionUrl::from(ROOT_URL),
    )
    .expect("backup");

    // Appending into the snapshot leaves the live set alone.
    let index = backup_index(&store, &outcome.backup_index_key);
    let snapshot_users = index.resolve(&SheetName::from("users")).expect("users");
    let mut ws = store
        .session()
        .document_by_key(snapshot_users)
        .expect("doc")
        .worksheet("users")
        .expect("ws");
    ws.append_row(None).set("id", "2");
    ws.save().expect("save");

    let live = store
        .session()
        .document_by_key(&DocumentKey::from("B1"))
        .expect("doc")
        .worksheet("users")
        .expect("ws");
    assert_eq!(live.populated_rows().len(), 1);
}

// ---------------------------------------------------------------------------
// 2. Rollback on store failure
// ---------------------------------------------------------------------------

#[test]
fn store_failure_mid_duplication_rolls_the_subcollection_back() {
    let store = seeded_store();
    // Route one sheet at a document that does not exist.
    let session = store.session();
    let mut idx_ws = session
        .document_by_key(&DocumentKey::from("IDX"))
        .expect("doc")
        .worksheet("table_map")
        .expect("ws");
    let row = idx_ws.append_row(None);
    row.set(SHEETNAME_COLUMN, "stray");
    row.set(KEY_COLUMN, "GONE");
    idx_ws.save().expect("save");

    let err = backup(
        &session,
        &MasterConfig::default(),
        &DocumentKey::from("IDX"),
        &CollectionUrl::from(ROOT_URL),
    )
    .unwrap_err();
    assert!(
        matches!(err, SyncError::Store(StoreError::DocumentNotFound { .. })),
        "got: {err}"
    );

    // The timestamped sub-collection and everything added to it are gone.
    assert_eq!(store.collection_urls(), vec![ROOT_URL.to_owned()]);
    assert!(!store.document_exists(&DocumentKey::from("mem-doc-1")));
    assert!(store.document_exists(&DocumentKey::from("B1")));
    assert!(store.document_exists(&DocumentKey::from("B2")));
}

// ---------------------------------------------------------------------------
// 3. Verification failure
// ---------------------------------------------------------------------------

/// Store whose `duplicate` hands back the source document unchanged, so the
/// rewritten index keeps routing at originals and verification must fail.
#[derive(Clone)]
struct IdentityStore {
    index_rows: Vec<Row>,
    deleted: Rc<RefCell<Vec<String>>>,
}

struct IdentityDoc {
    key: DocumentKey,
    rows: Vec<Row>,
}

struct IdentityWs {
    header: Vec<String>,
    rows: Vec<Row>,
}

#[derive(Debug)]
struct IdentityColl {
    url: CollectionUrl,
    deleted: Rc<RefCell<Vec<String>>>,
}

impl Session for IdentityStore {
    type Doc = IdentityDoc;
    type Coll = IdentityColl;

    fn document_by_key(&self, key: &DocumentKey) -> Result<IdentityDoc, StoreError> {
        Ok(IdentityDoc {
            key: key.clone(),
            rows: self.index_rows.clone(),
        })
    }

    fn collection_by_url(&self, url: &CollectionUrl) -> Result<IdentityColl, StoreError> {
        Ok(IdentityColl {
            url: url.clone(),
            deleted: Rc::clone(&self.deleted),
        })
    }
}

impl Document for IdentityDoc {
    type Ws = IdentityWs;

    fn key(&self) -> &DocumentKey {
        &self.key
    }

    fn title(&self) -> &str {
        "doc"
    }

    fn worksheet(&self, _title: &str) -> Result<IdentityWs, StoreError> {
        Ok(IdentityWs {
            header: vec![SHEETNAME_COLUMN.to_owned(), KEY_COLUMN.to_owned()],
            rows: self.rows.clone(),
        })
    }

    fn duplicate(&self, _new_title: &str) -> Result<Self, StoreError> {
        Ok(IdentityDoc {
            key: self.key.clone(),
            rows: self.rows.clone(),
        })
    }
}

impl Worksheet for IdentityWs {
    fn title(&self) -> &str {
        "table_map"
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
        Ok(())
    }
}

impl Collection for IdentityColl {
    type Doc = IdentityDoc;

    fn url(&self) -> &CollectionUrl {
        &self.url
    }

    fn create_subcollection(&self, title: &str) -> Result<Self, StoreError> {
        Ok(IdentityColl {
            url: CollectionUrl::from(format!("{}/{}", self.url.0, title)),
            deleted: Rc::clone(&self.deleted),
        })
    }

    fn add(&mut self, _doc: &IdentityDoc) -> Result<(), StoreError> {
        Ok(())
    }

    fn remove(&mut self, _doc: &IdentityDoc) -> Result<(), StoreError> {
        Ok(())
    }

    fn delete(self) -> Result<(), StoreError> {
        self.deleted.borrow_mut().push(self.url.0.clone());
        Ok(())
    }
}

#[test]
fn stale_keys_after_duplication_trigger_rollback() {
    let session = IdentityStore {
        index_rows: vec![index_row("users", "B1")],
        deleted: Rc::default(),
    };

    let err = backup(
        &session,
        &MasterConfig::default(),
        &DocumentKey::from("IDX"),
        &CollectionUrl::from(ROOT_URL),
    )
    .unwrap_err();

    match err {
        SyncError::BackupInconsistency { stale_keys } => {
            assert_eq!(stale_keys, vec![DocumentKey::from("B1")]);
        }
        other => panic!("expected backup inconsistency, got {other}"),
    }

    let deleted = session.deleted.borrow();
    assert_eq!(deleted.len(), 1, "sub-collection must be rolled back");
    assert!(deleted[0].starts_with(&format!("{ROOT_URL}/backup-")));
}
