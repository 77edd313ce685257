use anyhow::Result;
use axum::Router;
use cinesim_core::{EngineOptions, RecommendResult, Recommender};
use cinesim_server::{build_app, exit_outcome, spawn_load, Shutdown};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Model directory written by cinesim-indexer
    #[arg(long, env = "MODELS_DIR", default_value = "./models")]
    models: PathBuf,
    /// Host to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,
    /// Similarity cache file, defaults to similarity.bin in the model directory
    #[arg(long, env = "SIMILARITY_CACHE")]
    similarity_cache: Option<PathBuf>,
    /// Score movie-to-movie queries on demand instead of holding the N×N matrix
    #[arg(long, env = "LAZY_SIMILARITY", default_value_t = false)]
    lazy_similarity: bool,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    // Built by hand so an interrupted load does not hold up process exit.
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    let result = runtime.block_on(serve(args));
    runtime.shutdown_background();
    result
}

async fn serve(args: Args) -> Result<()> {
    let options = EngineOptions { similarity_cache: args.similarity_cache, lazy_similarity: args.lazy_similarity };
    let recommender = Arc::new(Recommender::new(&args.models, options));
    let app: Router = build_app(recommender.clone());

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, models = %args.models.display(), "server listening");

    let load = spawn_load(recommender.clone());
    let (reason_tx, reason_rx) = oneshot::channel();
    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal(load, reason_tx)).await?;

    let reason = reason_rx.await.unwrap_or(Shutdown::Interrupted);
    exit_outcome(reason, &recommender.readiness())
}

/// Resolves on Ctrl-C, or as soon as model loading fails.
async fn shutdown_signal(load: JoinHandle<RecommendResult<()>>, reason: oneshot::Sender<Shutdown>) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "could not listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    let load_failed = async {
        match load.await {
            Ok(Ok(())) => std::future::pending::<()>().await,
            Ok(Err(e)) => tracing::error!(error = %e, "model loading failed, shutting down"),
            Err(e) => tracing::error!(error = %e, "model loading task aborted, shutting down"),
        }
    };
    let cause = tokio::select! {
        _ = ctrl_c => {
            tracing::info!("shutdown requested");
            Shutdown::Interrupted
        }
        _ = load_failed => Shutdown::LoadFailed,
    };
    let _ = reason.send(cause);
}
