use axum::body::{Body, Bytes};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use cinesim_core::persist::{save_model, ModelPaths};
use cinesim_core::{Corpus, EngineOptions, Movie, Recommender, TfidfVectorizer, VectorizerConfig};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

fn movie(id: i64, title: &str, genres: &[&str]) -> Movie {
    Movie {
        id,
        title: title.into(),
        genres: genres.iter().map(|g| g.to_string()).collect(),
        feature_text: format!("{} {}", title, genres.join(" ")),
    }
}

fn build_tiny_model(dir: &std::path::Path) {
    let corpus = Corpus::new(vec![
        movie(1, "Toy Story", &["Animation", "Comedy"]),
        movie(2, "Toy Story 2", &["Animation", "Comedy"]),
        movie(3, "Die Hard", &["Action"]),
    ])
    .unwrap();
    let (vectorizer, matrix) =
        TfidfVectorizer::fit_transform(&corpus.feature_texts(), VectorizerConfig::default()).unwrap();
    save_model(&ModelPaths::new(dir), &corpus, &vectorizer, &matrix).unwrap();
}

fn loaded_app() -> (TempDir, Router) {
    let dir = tempdir().unwrap();
    build_tiny_model(dir.path());
    let recommender = Arc::new(Recommender::new(dir.path(), EngineOptions::default()));
    recommender.load().unwrap();
    let app = cinesim_server::build_app(recommender);
    (dir, app)
}

async fn send(app: Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.oneshot(req).await.unwrap();
    let status = resp.status();
    let body: Bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, json)
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    send(app, Request::get(uri).body(Body::empty()).unwrap()).await
}

async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let req = Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, req).await
}

#[tokio::test]
async fn similar_movies_ranks_sequel_first() {
    let (_dir, app) = loaded_app();
    let (status, json) = get(app, "/movies/1/recommendations?top_n=2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["movie_id"], 1);
    let recs = json["recommendations"].as_array().unwrap();
    assert_eq!(recs.len(), 2);
    assert_eq!(recs[0]["movie_id"], 2);
    assert_eq!(recs[1]["movie_id"], 3);
    assert_eq!(recs[0]["rank"], 1);
    assert_eq!(recs[0]["genres"], json!(["Animation", "Comedy"]));
}

#[tokio::test]
async fn similar_movies_defaults_and_excludes_self() {
    let (_dir, app) = loaded_app();
    let (status, json) = get(app, "/movies/3/recommendations").await;
    assert_eq!(status, StatusCode::OK);
    let recs = json["recommendations"].as_array().unwrap();
    assert_eq!(recs.len(), 2);
    assert!(recs.iter().all(|r| r["movie_id"] != 3));
}

#[tokio::test]
async fn unknown_movie_is_404() {
    let (_dir, app) = loaded_app();
    let (status, json) = get(app.clone(), "/movies/42/recommendations").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"], "Movie ID 42 not found");
    let (status, _) = get(app, "/movies/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn non_numeric_movie_id_is_400() {
    let (_dir, app) = loaded_app();
    let (status, json) = get(app, "/movies/abc/recommendations").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn profile_recommendation_echoes_input() {
    let (_dir, app) = loaded_app();
    let (status, json) = post_json(app, "/recommend", json!({ "genres": ["Action"], "favorites": [], "top_n": 2 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user_input"]["requested_count"], 2);
    assert_eq!(json["user_input"]["returned_count"], 2);
    assert_eq!(json["recommendations"][0]["movie_id"], 3);
    let score = json["recommendations"][0]["similarity"].as_f64().unwrap();
    assert!(score > 0.0 && score <= 1.0);
}

#[tokio::test]
async fn profile_top_n_is_clamped() {
    let (_dir, app) = loaded_app();
    let (status, json) = post_json(app, "/recommend", json!({ "genres": ["Comedy"], "favorites": ["Toy Story"], "top_n": 500 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user_input"]["requested_count"], 500);
    assert_eq!(json["user_input"]["returned_count"], 3);
}

#[tokio::test]
async fn empty_profile_is_400() {
    let (_dir, app) = loaded_app();
    let (status, json) = post_json(app.clone(), "/recommend", json!({ "genres": [], "favorites": [] })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("at least one genre"));

    let req = Request::post("/recommend")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn title_search() {
    let (_dir, app) = loaded_app();
    let (status, json) = get(app.clone(), "/search?title=toy%20story").await;
    assert_eq!(status, StatusCode::OK);
    let results = json["results"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert!(results[0].get("similarity").is_none());

    let (status, json) = get(app.clone(), "/search?title=casablanca").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["results"], json!([]));

    let (status, _) = get(app, "/search").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_reports_ready() {
    let (_dir, app) = loaded_app();
    let (status, json) = get(app.clone(), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["total_movies"], 3);

    let (status, json) = get(app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["models_loaded"], true);
}

#[tokio::test]
async fn requests_before_load_are_503() {
    let dir = tempdir().unwrap();
    build_tiny_model(dir.path());
    let recommender = Arc::new(Recommender::new(dir.path(), EngineOptions::default()));
    let app = cinesim_server::build_app(recommender.clone());

    let (status, json) = get(app.clone(), "/movies/1/recommendations").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"], "Models are not ready");
    let (status, _) = post_json(app.clone(), "/recommend", json!({ "genres": ["Action"] })).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let (status, json) = get(app.clone(), "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["models_loaded"], false);

    let resp = app
        .clone()
        .oneshot(Request::get("/movies/1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(resp.headers()[header::RETRY_AFTER], "5");

    cinesim_server::spawn_load(recommender).await.unwrap().unwrap();
    let (status, _) = get(app, "/movies/1/recommendations").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn failed_load_is_reported_by_health() {
    let dir = tempdir().unwrap();
    let recommender = Arc::new(Recommender::new(dir.path(), EngineOptions::default()));
    let app = cinesim_server::build_app(recommender.clone());
    assert!(cinesim_server::spawn_load(recommender).await.unwrap().is_err());
    let (status, json) = get(app, "/health").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(json["initialization_error"].as_str().unwrap().contains("Data load error"));
}

#[test]
fn interrupt_during_load_exits_cleanly() {
    use cinesim_server::{exit_outcome, Shutdown};
    let dir = tempdir().unwrap();
    let recommender = Recommender::new(dir.path(), EngineOptions::default());
    assert!(exit_outcome(Shutdown::Interrupted, &recommender.readiness()).is_ok());
    assert!(exit_outcome(Shutdown::LoadFailed, &recommender.readiness()).is_err());

    assert!(recommender.load().is_err());
    let err = exit_outcome(Shutdown::Interrupted, &recommender.readiness()).unwrap_err();
    assert!(err.to_string().contains("model loading failed"));
}

#[test]
fn interrupt_after_load_exits_cleanly() {
    use cinesim_server::{exit_outcome, Shutdown};
    let dir = tempdir().unwrap();
    build_tiny_model(dir.path());
    let recommender = Recommender::new(dir.path(), EngineOptions::default());
    recommender.load().unwrap();
    assert!(exit_outcome(Shutdown::Interrupted, &recommender.readiness()).is_ok());
}
