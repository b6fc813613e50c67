//! Error types for the node orchestrator.

use crate::pool::PoolError;
use crate::store::StoreError;

/// Errors that can occur during node operation.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("persistent store not resolved yet")]
    StoreUnavailable,
    #[error("key pool error: {0}")]
    Pool(#[from] PoolError),
    #[error("bring-up ordering violation: {0}")]
    BringUp(&'static str),
    #[error("node not started")]
    NotStarted,
    #[error("node already running")]
    AlreadyRunning,
}
