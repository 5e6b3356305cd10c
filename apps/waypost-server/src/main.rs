//! Waypost Server - convention-routed JSON API with signed requests.
//!
//! Hosts the `account` and `auth` entities on an in-memory account store.
//!
//! # Usage
//!
//! ```text
//! WAYPOST_LISTEN=0.0.0.0:8080 waypost-server
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `WAYPOST_LISTEN` | `0.0.0.0:8080` | Bind address |
//! | `WAYPOST_BASE_PATH` | `/api` | Prefix for every route |
//! | `WAYPOST_AUTH_MAX_SKEW_SECS` | *(unset)* | Reject signatures dated further than this from now |
//! | `WAYPOST_ACCESS_LOG` | `true` | Emit a Common Log Format line per request |
//! | `WAYPOST_ALLOW_ROUTE_OVERRIDE` | `false` | Let later registrations replace earlier routes |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as HttpConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use waypost_accounts::{InMemoryAccountStore, register_account_routes};
use waypost_auth::AuthPolicy;
use waypost_core::WaypostConfig;
use waypost_http::{AccessLogger, DuplicatePolicy, Router, RouterBuilder, WaypostHttpService};

/// Server version reported at startup.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    Ok(())
}

/// Build the router from `config`, registering every entity against `store`.
fn build_router(config: &WaypostConfig, store: &Arc<InMemoryAccountStore>) -> Result<Router> {
    let auth_policy = config
        .auth_max_skew_secs
        .map(AuthPolicy::with_max_clock_skew_secs)
        .unwrap_or_default();
    let duplicate_policy = if config.allow_route_override {
        DuplicatePolicy::Replace
    } else {
        DuplicatePolicy::Reject
    };

    let mut builder = RouterBuilder::new(config.base_path.as_str())
        .auth_policy(auth_policy)
        .duplicate_policy(duplicate_policy);
    if config.access_log {
        builder = builder.post_processor(AccessLogger);
    }

    register_account_routes(&mut builder, store).context("failed to register account routes")?;
    builder.build().context("failed to build router")
}

/// Accept connections until ctrl-c, then drain in-flight requests.
async fn serve(listener: TcpListener, service: WaypostHttpService) -> Result<()> {
    let graceful = hyper_util::server::graceful::GracefulShutdown::new();
    let http = HttpConnBuilder::new(TokioExecutor::new());

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        info!("received shutdown signal, draining connections");
    };

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

                let svc = service.for_peer(peer_addr);
                let conn = http.serve_connection(TokioIo::new(stream), svc);
                let conn = graceful.watch(conn.into_owned());

                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        error!(peer_addr = %peer_addr, error = %e, "connection error");
                    }
                });
            }

            () = &mut shutdown => {
                info!("shutting down gracefully");
                break;
            }
        }
    }

    graceful.shutdown().await;
    info!("all connections drained, exiting");

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = WaypostConfig::from_env().context("failed to load configuration")?;
    init_tracing(&config.log_level)?;

    let store = Arc::new(InMemoryAccountStore::new());
    let router = build_router(&config, &store)?;
    router.log_summary();

    let addr: SocketAddr = config
        .listen
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.listen))?;

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    info!(
        %addr,
        base_path = %config.base_path,
        routes = router.routes().len(),
        version = VERSION,
        "starting Waypost Server",
    );

    serve(listener, WaypostHttpService::new(Arc::new(router))).await
}
