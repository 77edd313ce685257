use axum::{
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use cinesim_core::{Readiness, RecommendError, RecommendResult, Recommender};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod error;
pub mod handlers;

use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
}

pub fn build_app(recommender: Arc<Recommender>) -> Router {
    let app_state = AppState { recommender };

    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/recommend", post(handlers::recommend))
        .route("/movies/:movie_id", get(handlers::movie_details))
        .route("/movies/:movie_id/recommendations", get(handlers::similar_movies))
        .route("/search", get(handlers::search))
        .with_state(app_state)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    ApiError(RecommendError::Internal(format!("handler panicked: {detail}"))).into_response()
}

/// Why the server stopped accepting requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shutdown {
    Interrupted,
    LoadFailed,
}

/// Process result for a finished server. Only a failed load is an error; an
/// interrupt is a clean exit even when models never finished loading.
pub fn exit_outcome(shutdown: Shutdown, readiness: &Readiness) -> anyhow::Result<()> {
    if let Some(err) = &readiness.initialization_error {
        anyhow::bail!("model loading failed: {err}");
    }
    match shutdown {
        Shutdown::LoadFailed => anyhow::bail!("model loading task stopped before completing"),
        Shutdown::Interrupted => {
            if !readiness.models_loaded {
                tracing::info!("interrupted while models were loading");
            }
            Ok(())
        }
    }
}

/// Load models on a blocking thread. The router answers 503 until this finishes.
pub fn spawn_load(recommender: Arc<Recommender>) -> JoinHandle<RecommendResult<()>> {
    tokio::task::spawn_blocking(move || {
        let start = std::time::Instant::now();
        let engine = recommender.load()?;
        tracing::info!(
            num_movies = engine.len(),
            took_s = start.elapsed().as_secs_f64(),
            "application ready"
        );
        Ok(())
    })
}
