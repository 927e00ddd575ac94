//! Sheetmaster core library — data model, store contract, index table,
//! configuration.
//!
//! Public API surface:
//! - [`types`] — newtypes and the [`types::Row`] cell mapping
//! - [`store`] — traits the remote tabular-storage service is driven through
//! - [`index`] — [`index::IndexTable`], the sheetname → document-key routing view
//! - [`config`] — [`config::MasterConfig`] load / save
//! - [`mem`] — in-memory store for tests and rehearsals
//! - [`error`] — [`StoreError`], [`IndexError`], [`ConfigError`]

pub mod config;
pub mod error;
pub mod index;
pub mod mem;
pub mod store;
pub mod types;

pub use config::MasterConfig;
pub use error::{ConfigError, IndexError, StoreError};
pub use index::{IndexEntry, IndexTable};
pub use store::{Collection, Document, Session, TokenSource, Worksheet};
pub use types::{CollectionUrl, DocumentKey, Row, SheetName};
