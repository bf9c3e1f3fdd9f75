//! bzk API server

use bzk_api::{AppState, routes};
use bzk_config::{LogFormat, ServerConfig};
use bzk_db::{Repositories, create_pool, run_migrations};
use bzk_executor::DockerExecutor;
use bzk_orchestrator::{OrchestratorSettings, record_outcomes};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Monitor reports waiting for the status recorder.
const REPORT_BUFFER: usize = 256;

#[derive(Debug, Parser)]
#[command(name = "bzk-server", version, about = "bzk job orchestrator API server")]
struct Args {
    /// KDL configuration file. Environment variables override its values.
    #[arg(short, long, env = "BZK_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = ServerConfig::load(args.config.as_deref())?;

    init_tracing(config.log_format);

    info!("Connecting to database...");
    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;
    info!("Database connected");

    let executor = Arc::new(DockerExecutor::connect(&config.docker_sock)?);
    info!(socket = %config.docker_sock, "Docker connected");

    let repos = Repositories::postgres(pool);
    let shutdown = CancellationToken::new();
    let (reports_tx, reports_rx) = mpsc::channel(REPORT_BUFFER);
    let recorder = tokio::spawn(record_outcomes(repos.jobs.clone(), reports_rx));

    let state = AppState::new(
        repos,
        executor,
        reports_tx,
        shutdown.clone(),
        OrchestratorSettings::from(&config),
    );

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    info!("Starting server on {}", config.listen);
    let listener = TcpListener::bind(config.listen).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Monitors stop watching; running units are left alone.
    shutdown.cancel();
    if let Err(e) = recorder.await {
        warn!(error = %e, "Status recorder did not finish cleanly");
    }

    info!("Graceful shutdown complete");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
    }
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT, starting graceful shutdown"),
        () = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }
}
