//! sledgate - S3-compatible object storage gateway over sled.
//!
//! Speaks a subset of the S3 REST protocol (bucket and object CRUD,
//! `ListObjectsV2`, ranged reads) with optional SigV4 verification, and
//! persists everything in a single sled database.
//!
//! # Usage
//!
//! ```text
//! sledgate --listen 0.0.0.0:9000 --db_path ./sledgate_db --auth sigv4 \
//!     --access_key AKIDEXAMPLE --secret_key YOURSECRET
//! ```
//!
//! Long flags keep underscore spellings for drop-in compatibility with
//! existing deployment scripts. `RUST_LOG` controls log filtering
//! (default `info`).

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sledgate_api::{Api, ApiConfig};
use sledgate_auth::{AuthMode, Credentials};
use sledgate_server::{GatewayService, Metrics, serve};
use sledgate_store::{KvObserver, ObjectStore};

/// S3-compatible object storage gateway over an embedded sled keyspace.
#[derive(Debug, Parser)]
#[command(name = "sledgate", version, about)]
struct Args {
    /// Listen address host:port.
    #[arg(long, default_value = "0.0.0.0:9000")]
    listen: String,

    /// Database directory.
    #[arg(long = "db_path", default_value = "./sledgate_db")]
    db_path: String,

    /// Worker threads (defaults to the hardware parallelism).
    #[arg(long)]
    threads: Option<usize>,

    /// Page cache size (MiB).
    #[arg(long = "cache_mb", default_value_t = 512)]
    cache_mb: u64,

    /// Max PUT object size (MiB).
    #[arg(long = "max_object_mb", default_value_t = 64)]
    max_object_mb: usize,

    /// Auth mode: none | sigv4.
    #[arg(long, default_value = "none")]
    auth: AuthMode,

    /// SigV4 access key.
    #[arg(long = "access_key", default_value = "AKIDEXAMPLE")]
    access_key: String,

    /// SigV4 secret key.
    #[arg(long = "secret_key", default_value = "YOURSECRET")]
    secret_key: String,

    /// Enable virtual-host style addressing: bucket.<suffix>.
    #[arg(long = "virtual_host_suffix", default_value = "")]
    virtual_host_suffix: String,

    /// Disable periodic background flushing (lower write amplification,
    /// weaker durability).
    #[arg(long = "disable_wal")]
    disable_wal: bool,

    /// Flush after every write (higher durability, higher latency).
    #[arg(long)]
    sync: bool,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let threads = args
        .threads
        .unwrap_or_else(|| std::thread::available_parallelism().map_or(1, usize::from))
        .max(1);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(threads)
        .enable_all()
        .build()
        .context("failed to build the runtime")?;

    runtime.block_on(run(args, threads))
}

async fn run(args: Args, threads: usize) -> Result<()> {
    let mut db_config = sled::Config::new()
        .path(&args.db_path)
        .cache_capacity(args.cache_mb * 1024 * 1024);
    if args.disable_wal {
        db_config = db_config.flush_every_ms(None);
    }
    let db = db_config
        .open()
        .with_context(|| format!("failed to open database at {}", args.db_path))?;

    let max_object_bytes = args.max_object_mb.max(1) * 1024 * 1024;

    let metrics = Arc::new(Metrics::new());
    let store = ObjectStore::with_observer(db, Arc::clone(&metrics) as Arc<dyn KvObserver>)
        .synchronous(args.sync);
    let api = Arc::new(Api::new(
        store,
        ApiConfig {
            auth_mode: args.auth,
            credentials: Credentials {
                access_key: args.access_key,
                secret_key: args.secret_key,
            },
            virtual_host_suffix: args.virtual_host_suffix.clone(),
            max_object_bytes,
        },
    ));
    let service = GatewayService::new(api, metrics, max_object_bytes);

    let listener = TcpListener::bind(args.listen.as_str())
        .await
        .with_context(|| format!("failed to bind to {}", args.listen))?;

    info!(
        listen = %args.listen,
        db_path = %args.db_path,
        threads,
        auth = ?args.auth,
        virtual_host_suffix = %args.virtual_host_suffix,
        max_object_mb = args.max_object_mb,
        "starting sledgate",
    );

    serve(listener, service).await
}
