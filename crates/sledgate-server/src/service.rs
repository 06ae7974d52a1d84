//! The per-connection service: read, dispatch, measure.
//!
//! Each request is read fully (bounded by the configured body limit),
//! dispatched to the API - except `GET /metrics`, which is answered here
//! without touching the store - and observed on the metrics registry with
//! its method, status, byte counts, and latency.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::service::Service;
use tracing::debug;

use sledgate_api::Api;

use crate::metrics::Metrics;

/// hyper service wrapping the API and metrics registry.
pub struct GatewayService {
    api: Arc<Api>,
    metrics: Arc<Metrics>,
    max_body_bytes: usize,
}

impl GatewayService {
    /// Create the service. `max_body_bytes` bounds how much of a request
    /// body is read before the request is refused.
    #[must_use]
    pub fn new(api: Arc<Api>, metrics: Arc<Metrics>, max_body_bytes: usize) -> Self {
        Self {
            api,
            metrics,
            max_body_bytes,
        }
    }
}

impl Clone for GatewayService {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            metrics: Arc::clone(&self.metrics),
            max_body_bytes: self.max_body_bytes,
        }
    }
}

impl Service<http::Request<Incoming>> for GatewayService {
    type Response = http::Response<Full<Bytes>>;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn call(&self, req: http::Request<Incoming>) -> Self::Future {
        let api = Arc::clone(&self.api);
        let metrics = Arc::clone(&self.metrics);
        let max_body_bytes = self.max_body_bytes;

        Box::pin(async move {
            let method = req.method().as_str().to_owned();
            let (parts, incoming) = req.into_parts();

            let body = match Limited::new(incoming, max_body_bytes).collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
                    debug!(method, "request body exceeded the configured limit");
                    let response = api.entity_too_large(&parts);
                    metrics.observe_request(&method, response.status().as_u16(), 0, 0, 0.0);
                    return Ok(response.map(Full::new));
                }
                Err(err) => {
                    debug!(method, error = %err, "failed to read request body");
                    let response = http::Response::builder()
                        .status(http::StatusCode::BAD_REQUEST)
                        .body(Full::new(Bytes::new()))
                        .expect("static response");
                    return Ok(response);
                }
            };

            // Latency runs from read-completion to response hand-off.
            let start = Instant::now();
            metrics.inc_inflight();

            let response = if parts.method == http::Method::GET && parts.uri.path() == "/metrics" {
                metrics_response(&metrics)
            } else {
                api.handle(&parts, &body)
            };

            let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
            metrics.observe_request(
                &method,
                response.status().as_u16(),
                body.len(),
                response.body().len(),
                latency_ms,
            );
            metrics.dec_inflight();

            Ok(response.map(Full::new))
        })
    }
}

/// Render the Prometheus exposition for `GET /metrics`.
fn metrics_response(metrics: &Metrics) -> http::Response<Bytes> {
    http::Response::builder()
        .status(http::StatusCode::OK)
        .header(http::header::CONTENT_TYPE, "text/plain; version=0.0.4")
        .body(Bytes::from(metrics.render_prometheus()))
        .expect("static response")
}
