//! Configuration snapshots.
//!
//! Export captures the whole live state as a versioned JSON document;
//! import sanitizes such a document and applies it in replace or merge mode.

mod document;
mod merge;

pub use document::{ImportPayload, Snapshot, SNAPSHOT_VERSION};
pub use merge::{apply, rewrite_ids, ImportMode, ImportReport};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImportError {
    /// The document is not a JSON object; nothing was applied
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
