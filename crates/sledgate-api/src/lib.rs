//! S3 protocol surface for the sledgate gateway.
//!
//! Takes parsed HTTP requests, routes them to object-store operations, and
//! renders S3-shaped responses:
//!
//! - [`target`] - request-target parsing, path-style and virtual-host-style
//!   bucket resolution
//! - [`range`] - single `Range: bytes=...` parsing with S3 semantics
//! - [`xml`] - response bodies (`ListAllMyBucketsResult`,
//!   `ListBucketResult`, the `<Error>` envelope)
//! - [`handler`] - the [`Api`](handler::Api) dispatcher tying it together
//!
//! Authentication runs before routing; a PUT body oversize check runs
//! before dispatch. Every storage error maps to exactly one HTTP status and
//! S3 error code.

pub mod handler;
pub mod range;
pub mod target;
pub mod xml;

pub use handler::{Api, ApiConfig};
