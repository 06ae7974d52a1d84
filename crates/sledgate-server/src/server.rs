//! TCP accept loop with graceful shutdown.
//!
//! One shared listener feeds the tokio runtime; every accepted connection
//! gets TCP_NODELAY and its own spawned task driving the HTTP state
//! machine. On shutdown the loop stops accepting and drains in-flight
//! connections.

use std::future::Future;

use anyhow::Result;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::service::GatewayService;

/// Serve connections until ctrl-c.
pub async fn serve(listener: TcpListener, service: GatewayService) -> Result<()> {
    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };
    serve_with_shutdown(listener, service, shutdown).await
}

/// Serve connections until `shutdown` resolves, then drain.
pub async fn serve_with_shutdown(
    listener: TcpListener,
    service: GatewayService,
    shutdown: impl Future<Output = ()>,
) -> Result<()> {
    let graceful = GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = match result {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "failed to accept connection");
                        continue;
                    }
                };
                stream.set_nodelay(true).ok();

                let svc = service.clone();
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}
