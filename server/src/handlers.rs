use axum::{
    extract::{rejection::{JsonRejection, PathRejection, QueryRejection}, Path, Query, State},
    http::StatusCode,
    Json,
};
use cinesim_core::{MovieId, MovieSummary, Recommendation};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub favorites: Vec<String>,
    #[serde(default = "default_profile_n")]
    pub top_n: usize,
}
fn default_profile_n() -> usize { 5 }

#[derive(Debug, Deserialize)]
pub struct SimilarParams {
    #[serde(default = "default_similar_n")]
    pub top_n: usize,
}
fn default_similar_n() -> usize { 10 }

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub title: Option<String>,
}

#[derive(Serialize)]
pub struct UserInput {
    pub genres: Vec<String>,
    pub favorites: Vec<String>,
    pub requested_count: usize,
    pub returned_count: usize,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user_input: UserInput,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Serialize)]
pub struct SimilarResponse {
    pub success: bool,
    pub movie_id: MovieId,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub results: Vec<MovieSummary>,
}

pub async fn root(State(state): State<AppState>) -> Json<Value> {
    let readiness = state.recommender.readiness();
    Json(json!({
        "message": "Movie Recommendation API",
        "status": if readiness.models_loaded { "running" } else { "error" },
        "models_loaded": readiness.models_loaded,
        "total_movies": readiness.total_movies,
        "initialization_error": readiness.initialization_error,
        "endpoints": {
            "user_recommendations": "POST /recommend",
            "movie_recommendations": "GET /movies/{movie_id}/recommendations",
            "movie_details": "GET /movies/{movie_id}",
            "title_search": "GET /search?title=...",
            "health_check": "GET /health"
        },
        "example_request": {
            "url": "/recommend",
            "method": "POST",
            "body": {
                "genres": ["Action", "Adventure"],
                "favorites": ["Spider-Man", "Batman"],
                "top_n": 5
            }
        }
    }))
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let readiness = state.recommender.readiness();
    let status = if readiness.models_loaded { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    let timestamp = time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default();
    (
        status,
        Json(json!({
            "status": if readiness.models_loaded { "healthy" } else { "unhealthy" },
            "models_loaded": readiness.models_loaded,
            "total_movies": readiness.total_movies,
            "initialization_error": readiness.initialization_error,
            "timestamp": timestamp,
        })),
    )
}

pub async fn recommend(
    State(state): State<AppState>,
    body: Result<Json<RecommendRequest>, JsonRejection>,
) -> ApiResult<Json<ProfileResponse>> {
    // Not-ready takes precedence over a malformed body.
    let engine = state.recommender.engine()?;
    let Json(request) = body.map_err(|e| ApiError::invalid(e.body_text()))?;
    let recommendations = engine.recommend_by_profile(&request.genres, &request.favorites, request.top_n)?;
    tracing::debug!(
        genres = request.genres.len(),
        favorites = request.favorites.len(),
        returned = recommendations.len(),
        "profile recommendations"
    );
    Ok(Json(ProfileResponse {
        success: true,
        user_input: UserInput {
            returned_count: recommendations.len(),
            requested_count: request.top_n,
            genres: request.genres,
            favorites: request.favorites,
        },
        recommendations,
    }))
}

pub async fn similar_movies(
    State(state): State<AppState>,
    movie_id: Result<Path<MovieId>, PathRejection>,
    params: Result<Query<SimilarParams>, QueryRejection>,
) -> ApiResult<Json<SimilarResponse>> {
    let engine = state.recommender.engine()?;
    let Path(movie_id) = movie_id.map_err(|e| ApiError::invalid(e.body_text()))?;
    let Query(params) = params.map_err(|e| ApiError::invalid(e.body_text()))?;
    let recommendations = engine.recommend_by_movie(movie_id, params.top_n)?;
    Ok(Json(SimilarResponse { success: true, movie_id, recommendations }))
}

pub async fn movie_details(
    State(state): State<AppState>,
    movie_id: Result<Path<MovieId>, PathRejection>,
) -> ApiResult<Json<MovieSummary>> {
    let engine = state.recommender.engine()?;
    let Path(movie_id) = movie_id.map_err(|e| ApiError::invalid(e.body_text()))?;
    Ok(Json(engine.movie(movie_id)?))
}

pub async fn search(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<Json<SearchResponse>> {
    let engine = state.recommender.engine()?;
    let Query(params) = params.map_err(|e| ApiError::invalid(e.body_text()))?;
    let title = params
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::invalid("query parameter 'title' is required"))?;
    let results = engine.search_by_title(&title)?;
    Ok(Json(SearchResponse { results }))
}
