//! Request and KV metrics.
//!
//! Counters and histogram buckets are plain atomics so observation never
//! takes a lock on the request path. Histograms share one fixed bucket
//! boundary set; the Prometheus rendering emits cumulative `_bucket{le=...}`
//! lines, an explicit `+Inf` bucket, `_sum`, and `_count`.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use sledgate_store::{KvObserver, KvOp};

/// Histogram bucket upper bounds, in milliseconds.
const BUCKETS_MS: [f64; 13] = [
    1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
];

const METHODS: [&str; 6] = ["GET", "PUT", "POST", "DELETE", "HEAD", "OTHER"];
const KV_OPS: [&str; 6] = ["get", "put", "write", "delete", "iter", "other"];

fn method_index(method: &str) -> usize {
    METHODS
        .iter()
        .position(|&m| m == method)
        .unwrap_or(METHODS.len() - 1)
}

fn kv_op_index(op: KvOp) -> usize {
    match op {
        KvOp::Get => 0,
        KvOp::Put => 1,
        KvOp::Write => 2,
        KvOp::Delete => 3,
        KvOp::Iter => 4,
        KvOp::Other => 5,
    }
}

/// Fixed-bucket latency histogram with atomic counters.
#[derive(Default)]
struct Histogram {
    buckets: [AtomicU64; BUCKETS_MS.len()],
    count: AtomicU64,
    sum_us: AtomicU64,
}

impl Histogram {
    fn observe(&self, latency_ms: f64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        let us = (latency_ms * 1000.0).round().max(0.0) as u64;
        self.sum_us.fetch_add(us, Ordering::Relaxed);

        for (bound, bucket) in BUCKETS_MS.iter().zip(&self.buckets) {
            if latency_ms <= *bound {
                bucket.fetch_add(1, Ordering::Relaxed);
                break;
            }
        }
    }

    fn render(&self, out: &mut String, name: &str) {
        let mut cumulative = 0u64;
        for (bound, bucket) in BUCKETS_MS.iter().zip(&self.buckets) {
            cumulative += bucket.load(Ordering::Relaxed);
            let _ = writeln!(out, "{name}_bucket{{le=\"{bound}\"}} {cumulative}");
        }
        let count = self.count.load(Ordering::Relaxed);
        let sum_ms = self.sum_us.load(Ordering::Relaxed) as f64 / 1000.0;
        let _ = writeln!(out, "{name}_bucket{{le=\"+Inf\"}} {count}");
        let _ = writeln!(out, "{name}_sum {sum_ms}");
        let _ = writeln!(out, "{name}_count {count}");
    }
}

/// The gateway's metrics registry.
///
/// One instance is shared by the session loop (request measurements) and
/// the object store (KV measurements, via [`KvObserver`]).
#[derive(Default)]
pub struct Metrics {
    req_counts: [AtomicU64; METHODS.len()],
    err_counts: [AtomicU64; METHODS.len()],
    req_bytes: [AtomicU64; METHODS.len()],
    resp_bytes: [AtomicU64; METHODS.len()],
    inflight: AtomicI64,
    latency: Histogram,

    kv_counts: [AtomicU64; KV_OPS.len()],
    kv_err_counts: [AtomicU64; KV_OPS.len()],
    kv_bytes: [AtomicU64; KV_OPS.len()],
    kv_latency: Histogram,
}

impl Metrics {
    /// Fresh registry with all counters at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A request entered the gateway.
    pub fn inc_inflight(&self) {
        self.inflight.fetch_add(1, Ordering::Relaxed);
    }

    /// A request's response was handed off.
    pub fn dec_inflight(&self) {
        self.inflight.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record one completed request. Status >= 400 counts as an error.
    pub fn observe_request(
        &self,
        method: &str,
        status: u16,
        req_bytes: usize,
        resp_bytes: usize,
        latency_ms: f64,
    ) {
        let idx = method_index(method);
        self.req_counts[idx].fetch_add(1, Ordering::Relaxed);
        self.req_bytes[idx].fetch_add(req_bytes as u64, Ordering::Relaxed);
        self.resp_bytes[idx].fetch_add(resp_bytes as u64, Ordering::Relaxed);
        if status >= 400 {
            self.err_counts[idx].fetch_add(1, Ordering::Relaxed);
        }
        self.latency.observe(latency_ms);
    }

    /// Render the Prometheus text exposition.
    #[must_use]
    pub fn render_prometheus(&self) -> String {
        let mut out = String::with_capacity(4096);

        render_counter_family(
            &mut out,
            "sledgate_requests_total",
            "Total HTTP requests.",
            "method",
            &METHODS,
            &self.req_counts,
        );
        render_counter_family(
            &mut out,
            "sledgate_request_errors_total",
            "HTTP requests with status >= 400.",
            "method",
            &METHODS,
            &self.err_counts,
        );
        render_counter_family(
            &mut out,
            "sledgate_request_bytes_total",
            "Request body bytes.",
            "method",
            &METHODS,
            &self.req_bytes,
        );
        render_counter_family(
            &mut out,
            "sledgate_response_bytes_total",
            "Response body bytes.",
            "method",
            &METHODS,
            &self.resp_bytes,
        );

        let _ = writeln!(out, "# HELP sledgate_inflight_requests In-flight HTTP requests.");
        let _ = writeln!(out, "# TYPE sledgate_inflight_requests gauge");
        let _ = writeln!(
            out,
            "sledgate_inflight_requests {}",
            self.inflight.load(Ordering::Relaxed)
        );

        let _ = writeln!(
            out,
            "# HELP sledgate_request_latency_ms Request latency in milliseconds."
        );
        let _ = writeln!(out, "# TYPE sledgate_request_latency_ms histogram");
        self.latency.render(&mut out, "sledgate_request_latency_ms");

        render_counter_family(
            &mut out,
            "sledgate_kv_ops_total",
            "KV operations.",
            "op",
            &KV_OPS,
            &self.kv_counts,
        );
        render_counter_family(
            &mut out,
            "sledgate_kv_errors_total",
            "KV operations that failed.",
            "op",
            &KV_OPS,
            &self.kv_err_counts,
        );
        render_counter_family(
            &mut out,
            "sledgate_kv_bytes_total",
            "KV bytes read and written.",
            "op",
            &KV_OPS,
            &self.kv_bytes,
        );

        let _ = writeln!(
            out,
            "# HELP sledgate_kv_latency_ms KV operation latency in milliseconds."
        );
        let _ = writeln!(out, "# TYPE sledgate_kv_latency_ms histogram");
        self.kv_latency.render(&mut out, "sledgate_kv_latency_ms");

        out
    }
}

impl KvObserver for Metrics {
    fn observe_kv(&self, op: KvOp, ok: bool, bytes: usize, latency_ms: f64) {
        let idx = kv_op_index(op);
        self.kv_counts[idx].fetch_add(1, Ordering::Relaxed);
        self.kv_bytes[idx].fetch_add(bytes as u64, Ordering::Relaxed);
        if !ok {
            self.kv_err_counts[idx].fetch_add(1, Ordering::Relaxed);
        }
        self.kv_latency.observe(latency_ms);
    }
}

fn render_counter_family<const N: usize>(
    out: &mut String,
    name: &str,
    help: &str,
    label: &str,
    label_values: &[&str; N],
    counters: &[AtomicU64; N],
) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} counter");
    for (value, counter) in label_values.iter().zip(counters) {
        let _ = writeln!(
            out,
            "{name}{{{label}=\"{value}\"}} {}",
            counter.load(Ordering::Relaxed)
        );
    }
}
