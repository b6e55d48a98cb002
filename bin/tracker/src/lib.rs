//! Multi-chain token balance tracker.
//!
//! [`Tracker`] owns the live state and drives fetches, alerts and
//! persistence; [`scheduler::RefreshScheduler`] refreshes it on an interval.

pub mod config;
mod engine;
pub mod metrics;
pub mod scheduler;
pub mod signal;

pub use engine::{FetchStatus, QueryHandle, Tracker};

use client::ClientError;
use normalize::EndpointError;
use registry::RegistryError;
use snapshot::ImportError;
use store::{CreateError, StorageError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error(transparent)]
    Create(#[from] CreateError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Import(#[from] ImportError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Invalid RPC URL: {0}")]
    Endpoint(#[from] EndpointError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("Unknown query: {0}")]
    UnknownQuery(String),

    /// Intervals must be positive and finite
    #[error("Invalid refresh interval: {0}")]
    InvalidRefreshInterval(f64),
}
