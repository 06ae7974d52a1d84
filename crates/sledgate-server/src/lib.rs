//! HTTP front-end for the sledgate gateway.
//!
//! - [`metrics`] - lock-free request and KV counters with Prometheus text
//!   rendering
//! - [`service`] - the hyper `Service` that reads a request, dispatches to
//!   the API (or serves `/metrics` locally), and records measurements
//! - [`serve`](server::serve) - the TCP accept loop with graceful shutdown

pub mod metrics;
pub mod server;
pub mod service;

pub use metrics::Metrics;
pub use server::{serve, serve_with_shutdown};
pub use service::GatewayService;
