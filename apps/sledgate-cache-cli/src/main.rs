//! sledgate-cache - prefix cache index over a running gateway.
//!
//! Stores token-addressed blobs into an S3-compatible gateway and recovers
//! the longest matching token prefix later:
//!
//! ```text
//! sledgate-cache --s3-endpoint http://127.0.0.1:9000 --s3-create-bucket \
//!     store --tokens A,B,C,D,E,F,G,H --data-file blob.bin --owner replica-1
//! sledgate-cache --s3-endpoint http://127.0.0.1:9000 \
//!     lookup --tokens A,B,C,D,E,F,G,H
//! sledgate-cache --s3-endpoint http://127.0.0.1:9000 \
//!     load --obj-id <hex> --usable-len 8 --out-file head.bin
//! ```
//!
//! Note the index lives in process memory; `lookup` and `load` only see
//! what was stored in the same invocation unless the object id is passed
//! explicitly.

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use sledgate_cache::{PrefixIndex, S3Config, S3Storage};

/// Prefix cache index over an S3-compatible gateway.
#[derive(Debug, Parser)]
#[command(name = "sledgate-cache", version, about)]
struct Cli {
    /// Token-count granularity of indexing.
    #[arg(long, default_value_t = 8)]
    block_size: usize,

    /// Bytes per token; 0 selects proportional sizing.
    #[arg(long, default_value_t = 0)]
    bytes_per_token: usize,

    /// Gateway base URL, e.g. http://127.0.0.1:9000.
    #[arg(long)]
    s3_endpoint: String,

    /// Bucket holding the cache objects.
    #[arg(long, default_value = "prompt-cache")]
    s3_bucket: String,

    /// Create the bucket on startup.
    #[arg(long)]
    s3_create_bucket: bool,

    /// Per-request timeout in milliseconds.
    #[arg(long, default_value_t = 5000)]
    s3_timeout_ms: u64,

    /// Connect timeout in milliseconds.
    #[arg(long, default_value_t = 2000)]
    s3_connect_timeout_ms: u64,

    /// Disable TLS certificate verification.
    #[arg(long)]
    s3_insecure: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload a blob and index its token prefixes.
    Store {
        /// Comma-separated token sequence.
        #[arg(long, value_delimiter = ',')]
        tokens: Vec<String>,

        /// File holding the blob bytes.
        #[arg(long)]
        data_file: PathBuf,

        /// Owner tag recorded on each prefix entry.
        #[arg(long, default_value = "")]
        owner: String,

        /// Priority recorded on each prefix entry.
        #[arg(long, default_value_t = 0)]
        priority: i32,
    },

    /// Find the longest indexed prefix of a token sequence.
    Lookup {
        /// Comma-separated token sequence.
        #[arg(long, value_delimiter = ',')]
        tokens: Vec<String>,

        /// Bound the search to this many tokens; 0 means unbounded.
        #[arg(long, default_value_t = 0)]
        max_len: usize,
    },

    /// Fetch the leading bytes of a stored object.
    Load {
        /// Content-addressed object id (hex).
        #[arg(long)]
        obj_id: String,

        /// How many leading bytes to fetch; 0 means all.
        #[arg(long, default_value_t = 0)]
        usable_len: usize,

        /// Write the bytes here instead of stdout.
        #[arg(long)]
        out_file: Option<PathBuf>,
    },

    /// Print index statistics.
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let storage = S3Storage::new(S3Config {
        endpoint: cli.s3_endpoint.clone(),
        bucket: cli.s3_bucket.clone(),
        timeout_ms: cli.s3_timeout_ms,
        connect_timeout_ms: cli.s3_connect_timeout_ms,
        verify_tls: !cli.s3_insecure,
    })
    .context("failed to build the storage client")?;

    if cli.s3_create_bucket {
        storage
            .create_bucket()
            .await
            .context("failed to create bucket")?;
    }

    let mut index = PrefixIndex::new(cli.block_size, cli.bytes_per_token, Arc::new(storage));

    match cli.command {
        Command::Store {
            tokens,
            data_file,
            owner,
            priority,
        } => {
            if tokens.is_empty() {
                bail!("--tokens must name at least one token");
            }
            let data = std::fs::read(&data_file)
                .with_context(|| format!("failed to read {}", data_file.display()))?;
            let obj_id = index
                .store(&tokens, &data, &owner, priority)
                .await
                .context("store failed")?;
            println!("obj_id={obj_id}");
            println!("prefixes={}", index.prefix_count());
        }

        Command::Lookup { tokens, max_len } => {
            if tokens.is_empty() {
                bail!("--tokens must name at least one token");
            }
            match index.lookup(&tokens, max_len) {
                None => println!("hit=false"),
                Some(hit) => {
                    println!("hit=true");
                    println!("obj_id={}", hit.obj_id);
                    println!("usable_len_bytes={}", hit.usable_len_bytes);
                    println!("prefix_tokens={}", hit.prefix_tokens);
                }
            }
        }

        Command::Load {
            obj_id,
            usable_len,
            out_file,
        } => {
            let data = index
                .load(&obj_id, usable_len)
                .await
                .context("object not found")?;
            match out_file {
                Some(path) => {
                    std::fs::write(&path, &data)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("wrote={}", path.display());
                }
                None => {
                    std::io::stdout().write_all(&data)?;
                }
            }
        }

        Command::Stats => {
            println!("objects={}", index.object_count());
            println!("prefixes={}", index.prefix_count());
            println!("block_size={}", index.block_size());
        }
    }

    Ok(())
}
