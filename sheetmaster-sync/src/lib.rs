//! # sheetmaster-sync
//!
//! Merge validation/apply and backup/snapshot orchestration over an
//! index-tracked document set.
//!
//! Call [`pipeline::run`] to merge sheets from a diff set into a base set,
//! [`backup::backup`] to duplicate a whole set with its routing rewritten,
//! or [`pipeline::rehearse`] to do both — snapshot first, then merge against
//! the snapshot.

pub mod backup;
pub mod error;
pub mod merge;
pub mod pipeline;
pub mod validate;

pub use backup::{backup, BackupOutcome};
pub use error::{IndexSide, SyncError};
pub use merge::{
    merge_all, merge_rows, merge_sheet, MergeReport, RowMergeStats, SheetIssue, SheetMergeResult,
};
pub use pipeline::{compare_headers, rehearse, run, MergeScope};
pub use validate::{find_id_collision, has_id_collision, same_columns, same_header};
