//! Treeserve server binary
//!
//! Lifecycle is strictly forward: parse and validate flags, start the
//! memory watchdog, build the tree from the lstat dumps on the main thread,
//! finalize, then publish the tree into the HTTP runtime and serve it
//! read-only until shutdown.
//!
//! ```bash
//! treeserve --lstat=scan-a.gz,scan-b.gz --port=8080 --mem_limit=6144
//! ```

mod config;
mod handlers;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{info, warn};

use config::{Args, ServerConfig};
use treeserve::watchdog::MemoryWatchdog;
use treeserve::{Tree, TreeBuilder};

fn main() -> ExitCode {
    let args = Args::parse();
    let config = match ServerConfig::from_args(args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        inputs = config.lstat_files.len(),
        listen = %config.listen_addr,
        "starting treeserve"
    );

    MemoryWatchdog::new(config.mem_limit_mb, config.mem_check_interval_secs).spawn();

    // Ingest and finalization are single-threaded and happen before the
    // async runtime exists; the HTTP side only ever sees the finished tree.
    let (tree, stats) = match TreeBuilder::new().from_lstat(&config.lstat_files) {
        Ok(built) => built,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        nodes = tree.node_count(),
        inserted = stats.inserted,
        skipped = stats.skipped,
        failed_files = stats.failed_files,
        "tree built"
    );

    if let Some(dump) = &config.dump {
        warn!(path = %dump.display(), "--dump requested but tree serialization is not implemented, skipping");
    }

    let mut runtime = tokio::runtime::Builder::new_multi_thread();
    runtime.enable_all();
    if config.threads > 0 {
        runtime.worker_threads(config.threads);
    }
    let runtime = match runtime.build() {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("failed to start runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(serve(&config, Arc::new(tree))) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn serve(config: &ServerConfig, tree: Arc<Tree>) -> std::io::Result<()> {
    let app = handlers::router(tree);

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!("serving on http://{}", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shutdown complete");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
