//! Filedrop Server

mod args;

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use args::Args;
use filedrop_server::constants::{DEBUG_LOG_FILTER, DEFAULT_LOG_FILTER};
use filedrop_server::{FileService, Storage, serve};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.debug);

    info!(version = env!("CARGO_PKG_VERSION"), "starting filedropd");

    // Setup storage
    let (storage, purged) = match Storage::open_root(&args.storage_dir) {
        Ok(opened) => opened,
        Err(e) => {
            error!(error = %e, "failed to open storage directory");
            return ExitCode::FAILURE;
        }
    };
    if purged > 0 {
        info!(count = purged, "removed stale staging files");
    }

    let config = args.service_config();
    info!(
        storage = %storage.root().display(),
        max_uploads = config.upload_capacity,
        max_downloads = config.download_capacity,
        max_listings = config.list_capacity,
        max_upload_size = config.max_upload_size,
        "file service ready"
    );
    let service = Arc::new(FileService::new(storage, config));

    // Setup network
    let addr = SocketAddr::new(args.bind, args.port);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "failed to bind");
            return ExitCode::FAILURE;
        }
    };
    info!(%addr, "listening");

    if let Err(e) = serve(listener, service, shutdown_signal()).await {
        error!(error = %e, "server error");
        return ExitCode::FAILURE;
    }

    info!("server stopped");
    ExitCode::SUCCESS
}

/// Install the global subscriber; `RUST_LOG` overrides the default filter
fn init_tracing(debug: bool) {
    let default_filter = if debug {
        DEBUG_LOG_FILTER
    } else {
        DEFAULT_LOG_FILTER
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Resolve on SIGINT or SIGTERM (Ctrl+C elsewhere)
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let (mut sigterm, mut sigint) =
            match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
                (Ok(sigterm), Ok(sigint)) => (sigterm, sigint),
                (Err(e), _) | (_, Err(e)) => {
                    error!(error = %e, "failed to install signal handlers");
                    return std::future::pending().await;
                }
            };

        tokio::select! {
            _ = sigterm.recv() => {},
            _ = sigint.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
