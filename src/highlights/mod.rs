//! Highlights: markers in the live tree and the durable log behind them
//!
//! A highlight exists twice: as an [`AnchorDescriptor`](crate::anchor::AnchorDescriptor)
//! in the chapter's log, and as a marker element wrapped around the decoded
//! range each time the chapter is rendered. Only the log is persisted.

mod log;
mod marks;

pub use log::{log_key, HighlightLog};
pub use marks::{apply_mark, remove_all_marks, restore_highlights, MarkConfig, RestoreReport};
