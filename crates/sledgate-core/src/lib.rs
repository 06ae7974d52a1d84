//! Shared codec utilities for the sledgate workspace.
//!
//! Everything here is a small, dependency-light building block used by more
//! than one crate:
//!
//! - [`codec`] - percent encoding/decoding, query parsing, canonical query
//!   strings, and SigV4 whitespace normalization
//! - [`digest`] - SHA-256 / MD5 / HMAC-SHA256 helpers and constant-time
//!   comparison
//! - [`timefmt`] - RFC 1123 and ISO-8601 rendering of Unix epoch seconds

pub mod codec;
pub mod digest;
pub mod timefmt;
