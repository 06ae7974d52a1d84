//! Cache failure taxonomy.
//!
//! A transport failure against the storage backend is a storage error, not
//! a crash; callers treat it like a miss.

/// Errors from the cache index and its storage backends.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The backend has no object under this id.
    #[error("object not found: {obj_id}")]
    NotFound {
        /// The content-addressed object id.
        obj_id: String,
    },

    /// The backend answered with a non-success status.
    #[error("storage backend returned status {status}")]
    BackendStatus {
        /// The HTTP status code.
        status: u16,
    },

    /// The HTTP transport failed (timeout, refused connection, TLS).
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
