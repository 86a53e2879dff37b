//! Controller Shim Error Hierarchy
//!
//! Errors are grouped by the collaborator that raised them. Only startup
//! synchronisation, configuration and task failures ever reach the caller;
//! the dispatch loop logs and folds everything else.

use config::ConfigError;
use tokio::task::JoinError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Resource cache failures (lookups, readiness)
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Object serialization, key derivation and expression failures
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Configuration loading and validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Dispatch task could not be joined
    #[error("Background task failed: {0}")]
    TaskFailed(#[from] JoinError),

    /// Unrecoverable failures
    #[error("Fatal error: {0}")]
    Fatal(String),
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Transient read failure; the event is dropped
    #[error("Failed to fetch {key} from resource cache: {reason}")]
    Lookup { key: String, reason: String },

    /// At least one informer never reported ready
    #[error("[{controller_id}] Timed out waiting for caches to sync")]
    NotSynced { controller_id: String },
}

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("Object is not serializable: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Expression `{expression}` failed: {reason}")]
    Expression { expression: String, reason: String },

    #[error("Cannot derive object key: {0}")]
    KeyDerivation(String),
}
