//! Storage error type.
//!
//! A closed sum so the protocol layer can map every variant to an HTTP
//! status and S3 error code as a total function.

/// Errors produced by [`crate::ObjectStore`] operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The named bucket does not exist.
    #[error("The specified bucket does not exist")]
    NoSuchBucket,

    /// The named object does not exist.
    #[error("The specified key does not exist")]
    NoSuchKey,

    /// A bucket delete was attempted while objects still live under it.
    #[error("The bucket you tried to delete is not empty")]
    BucketNotEmpty,

    /// A request field failed validation (NUL byte in a name, undecodable
    /// continuation token). The field name is for the error message only.
    #[error("Invalid {0}")]
    InvalidInput(&'static str),

    /// A metadata value did not decode. Stored metadata is written by this
    /// crate, so this indicates on-disk corruption.
    #[error("Corrupt metadata")]
    CorruptMetadata,

    /// The underlying sled tree failed.
    #[error(transparent)]
    Kv(#[from] sled::Error),
}

/// Convenience result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
