use crate::engine::{Engine, EngineOptions, MovieSummary, Recommendation};
use crate::error::{RecommendError, RecommendResult};
use crate::persist::ModelPaths;
use crate::MovieId;
use parking_lot::{Mutex, RwLock};
use std::path::Path;
use std::sync::Arc;

#[derive(Clone)]
enum LoadState {
    Loading,
    Ready(Arc<Engine>),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Readiness {
    pub models_loaded: bool,
    pub total_movies: usize,
    pub initialization_error: Option<String>,
}

/// Shared handle that gates every query on a completed load.
pub struct Recommender {
    paths: ModelPaths,
    options: EngineOptions,
    state: RwLock<LoadState>,
    load_lock: Mutex<()>,
}

impl Recommender {
    pub fn new<P: AsRef<Path>>(root: P, options: EngineOptions) -> Self {
        Self {
            paths: ModelPaths::new(root),
            options,
            state: RwLock::new(LoadState::Loading),
            load_lock: Mutex::new(()),
        }
    }

    /// Load the model directory once. Later calls return the same engine; a failed load may be retried.
    pub fn load(&self) -> RecommendResult<Arc<Engine>> {
        let _guard = self.load_lock.lock();
        if let LoadState::Ready(engine) = &*self.state.read() {
            return Ok(engine.clone());
        }
        match Engine::load(&self.paths, &self.options) {
            Ok(engine) => {
                let engine = Arc::new(engine);
                *self.state.write() = LoadState::Ready(engine.clone());
                Ok(engine)
            }
            Err(e) => {
                *self.state.write() = LoadState::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// The loaded engine, or `NotReady` while loading or after a failed load.
    pub fn engine(&self) -> RecommendResult<Arc<Engine>> {
        match &*self.state.read() {
            LoadState::Ready(engine) => Ok(engine.clone()),
            LoadState::Loading | LoadState::Failed(_) => Err(RecommendError::NotReady),
        }
    }

    pub fn readiness(&self) -> Readiness {
        match self.state.read().clone() {
            LoadState::Ready(engine) => Readiness {
                models_loaded: true,
                total_movies: engine.len(),
                initialization_error: None,
            },
            LoadState::Loading => Readiness { models_loaded: false, total_movies: 0, initialization_error: None },
            LoadState::Failed(reason) => Readiness {
                models_loaded: false,
                total_movies: 0,
                initialization_error: Some(reason),
            },
        }
    }

    pub fn recommend_by_profile(
        &self,
        genres: &[String],
        favorites: &[String],
        n: usize,
    ) -> RecommendResult<Vec<Recommendation>> {
        self.engine()?.recommend_by_profile(genres, favorites, n)
    }

    pub fn recommend_by_movie(&self, movie_id: MovieId, n: usize) -> RecommendResult<Vec<Recommendation>> {
        self.engine()?.recommend_by_movie(movie_id, n)
    }

    pub fn search_by_title(&self, needle: &str) -> RecommendResult<Vec<MovieSummary>> {
        self.engine()?.search_by_title(needle)
    }

    pub fn movie(&self, movie_id: MovieId) -> RecommendResult<MovieSummary> {
        self.engine()?.movie(movie_id)
    }
}
