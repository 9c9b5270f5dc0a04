//! Error types for the cache
//!
//! Provides unified error handling using thiserror.
//!
//! Cache misses are never errors: lookups return `Option`. The variants below
//! only cover the surfaces around the core (janitor hosting and configuration).

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Auto eviction was requested but no tokio runtime can host the janitor
    #[error("Runtime unavailable: auto eviction requires a tokio runtime")]
    RuntimeUnavailable,

    /// A configuration value could not be parsed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The janitor task panicked or was cancelled while being joined
    #[error("Janitor task failed: {0}")]
    Janitor(#[from] tokio::task::JoinError),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
