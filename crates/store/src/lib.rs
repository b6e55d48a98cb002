//! Live tracker state.
//!
//! This crate provides:
//! - [`QueryEntity`] and the [`QueryStore`] that owns their fetch lifecycle
//! - The project catalog, user identity and refresh settings
//! - [`LiveState`], loaded from and saved to a [`KeyValueStore`]
//! - Per-project balance summaries

pub mod project;
pub mod query;
pub mod state;
pub mod storage;
pub mod store;
pub mod summary;
pub mod user;

pub use project::{normalize_project_name, ProjectSet, DEFAULT_PROJECT};
pub use query::{CreateError, NewQuery, QueryEntity};
pub use state::LiveState;
pub use storage::{JsonDirStore, KeyValueStore, MemoryStore, StorageError};
pub use store::{QueryStore, PERMISSION_DENIED_MESSAGE};
pub use summary::{short_address, summarize, ProjectSummary, TokenTotal};
pub use user::{new_id, parse_seconds, RefreshSettings, User, MAX_REFRESH_SECS, MIN_REFRESH_SECS};
