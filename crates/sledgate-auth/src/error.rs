//! Verification failure taxonomy.

/// Why a request failed SigV4 verification.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No parsable authentication was presented at all.
    #[error("Missing or invalid authentication")]
    MissingAuthentication,

    /// The recomputed signature differs from the presented one, or the
    /// access key is unknown.
    #[error("The request signature we calculated does not match the signature you provided.")]
    SignatureDoesNotMatch,

    /// The credential scope names a service other than `s3`.
    #[error("Credential scope service must be s3")]
    InvalidScope,

    /// The client asked for streaming chunk-signed payloads, which this
    /// gateway does not implement.
    #[error("Streaming SigV4 payload signing is not implemented")]
    StreamingNotImplemented,
}
