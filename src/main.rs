//! Duplo web gateway binary.
//!
//! Serves the browser-facing pages of a Duplo file storage and forwards every
//! action to the storage gateway, translating the per-storage session cookie
//! into a bearer token. The main entry point parses configuration, builds the
//! Axum router, optionally configures TLS, and starts the listener.

mod auth;
mod config;
mod error;
mod files;
mod frontend;
mod gateway;
mod http;
mod logging;
mod multipart;
mod params;
mod router;
mod session;
mod tls;
mod views;

use axum_server::Handle;
use clap::Parser;
use shadow_rs::shadow;
use std::io::{Error, ErrorKind};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

use crate::config::Args;
use crate::gateway::Gateway;
use crate::multipart::UploadConfig;
use crate::session::CookieTokenStore;
use crate::views::Views;

shadow!(build);

/// Starts the web gateway and blocks until shutdown.
#[tokio::main]
async fn main() -> Result<(), Error> {
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| Error::other("failed to install rustls crypto provider"))?;
    logging::init_logging();

    let args = Args::parse();
    let gateway_url = args
        .validate()
        .map_err(|err| Error::new(ErrorKind::InvalidInput, err))?;
    let tls_config = tls::load_rustls_config(&args).await?;

    let tokens = Arc::new(CookieTokenStore::new(
        Duration::from_secs(args.session_expire_secs),
        tls_config.is_some(),
    ));
    let timeout = (args.request_timeout_secs > 0)
        .then(|| Duration::from_secs(args.request_timeout_secs));
    let gateway = Arc::new(
        Gateway::new(gateway_url.clone(), tokens, timeout)
            .map_err(|err| Error::other(format!("build gateway client: {err}")))?,
    );
    let views = Arc::new(Views::new().map_err(|err| Error::other(err.to_string()))?);
    let upload_config = Arc::new(UploadConfig {
        max_total_size: args.upload_max_size,
    });
    let app = router::build_router(gateway, views, upload_config);

    let host = args
        .host
        .parse::<IpAddr>()
        .map_err(|err| Error::new(ErrorKind::InvalidInput, err.to_string()))?;
    let addr = SocketAddr::new(host, args.port);
    let handle = Handle::new();
    tokio::spawn(shutdown_signal(handle.clone()));

    let service = app.into_make_service_with_connect_info::<SocketAddr>();
    match tls_config {
        Some(tls_config) => {
            info!(gateway = %gateway_url, "🔒 Starting HTTPS server at {}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(service)
                .await
        }
        None => {
            info!(gateway = %gateway_url, "🚀 Starting HTTP server at {}", addr);
            axum_server::bind(addr).handle(handle).serve(service).await
        }
    }
}

async fn shutdown_signal(handle: Handle) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(%err, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(%err, "failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received termination signal shutting down");
    handle.graceful_shutdown(Some(Duration::from_secs(10)));
}
