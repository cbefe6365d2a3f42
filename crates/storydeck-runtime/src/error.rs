#![forbid(unsafe_code)]

//! Error types for the navigation runtime.

use thiserror::Error;

use storydeck_core::StoreError;

// ─────────────────────────────────────────────────────────────────────────────
// Storage
// ─────────────────────────────────────────────────────────────────────────────

/// Errors raised by a [`StorageBackend`](crate::persistence::StorageBackend).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("data corruption: {0}")]
    Corruption(String),

    #[error("storage backend unavailable")]
    Unavailable,
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// ─────────────────────────────────────────────────────────────────────────────
// Access
// ─────────────────────────────────────────────────────────────────────────────

/// Failure to reach or evaluate the authorization collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("authorization request failed: {0}")]
    Request(String),

    #[error("authorization timed out")]
    Timeout,
}

// ─────────────────────────────────────────────────────────────────────────────
// Navigation
// ─────────────────────────────────────────────────────────────────────────────

/// Errors returned by navigation operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationError {
    /// Target id is not part of the page graph.
    #[error("unknown page: {0}")]
    UnknownPage(String),

    /// Another switch has not finished yet.
    #[error("a page transition is already in progress")]
    TransitionInProgress,

    /// The story has no pages or no active page yet.
    #[error("story has no active page")]
    NoActivePage,

    /// Automatic ad insertion is disabled for this story.
    #[error("inserting ads automatically is disallowed")]
    AdInsertionDisallowed,

    #[error(transparent)]
    Graph(#[from] StoreError),
}

/// Result type for navigation operations.
pub type NavigationResult<T> = Result<T, NavigationError>;
