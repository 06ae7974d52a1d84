//! AWS Signature Version 4 verification for the sledgate gateway.
//!
//! Supports the two SigV4 flavors the `s3` service sees in practice:
//!
//! - **Header signing**: `Authorization: AWS4-HMAC-SHA256 Credential=...,
//!   SignedHeaders=..., Signature=...` with a mandatory `x-amz-date` header.
//!   The payload hash comes from `x-amz-content-sha256` when present,
//!   otherwise it is computed from the body.
//! - **Presigned URLs**: `X-Amz-Algorithm`, `X-Amz-Credential`,
//!   `X-Amz-Date`, `X-Amz-Expires`, `X-Amz-SignedHeaders`,
//!   `X-Amz-Signature` query parameters, with the literal
//!   `UNSIGNED-PAYLOAD` payload hash.
//!
//! Verification tries header signing first and falls back to the presigned
//! form; a request carrying neither fails closed as access denied. The
//! streaming payload sentinel is rejected outright rather than silently
//! re-hashed.
//!
//! # Modules
//!
//! - [`canonical`] - canonical request construction
//! - [`sigv4`] - parsing, key derivation, and the verification entry point
//! - [`error`] - verification failure taxonomy

pub mod canonical;
pub mod error;
pub mod sigv4;

pub use error::AuthError;
pub use sigv4::{AuthMode, Credentials, verify};
