use crate::error::{RecommendError, RecommendResult};
use crate::movie::{Corpus, Movie};
use crate::persist::{self, ModelPaths};
use crate::ranker::{top_n, Ranked};
use crate::similarity::{pairwise, similarity, SimilarityMatrix};
use crate::sparse::SparseMatrix;
use crate::vectorizer::TfidfVectorizer;
use crate::MovieId;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Where the pairwise cache lives. Defaults to `similarity.bin` in the model directory.
    pub similarity_cache: Option<PathBuf>,
    /// Skip the N×N matrix and score movie-to-movie queries on demand.
    pub lazy_similarity: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub movie_id: MovieId,
    pub title: String,
    pub genres: Vec<String>,
    pub similarity: f32,
    /// 1-based position in the result list.
    pub rank: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovieSummary {
    pub movie_id: MovieId,
    pub title: String,
    pub genres: Vec<String>,
}

impl From<&Movie> for MovieSummary {
    fn from(m: &Movie) -> Self {
        Self { movie_id: m.id, title: m.title.clone(), genres: m.genres.clone() }
    }
}

/// Read-only recommendation context: corpus, fitted vectorizer, corpus matrix and optional pairwise scores.
pub struct Engine {
    corpus: Corpus,
    vectorizer: TfidfVectorizer,
    matrix: SparseMatrix,
    similarity: Option<SimilarityMatrix>,
    fingerprint: String,
}

impl Engine {
    /// Assemble an engine from fitted parts. With `lazy` unset the pairwise matrix is computed here.
    pub fn build(
        corpus: Corpus,
        vectorizer: TfidfVectorizer,
        matrix: SparseMatrix,
        lazy: bool,
    ) -> RecommendResult<Self> {
        check_shape(&corpus, &vectorizer, &matrix)?;
        let fingerprint = persist::fingerprint(corpus.movies(), vectorizer.state())
            .map_err(|e| RecommendError::Internal(format!("{e:#}")))?;
        let similarity = (!lazy).then(|| pairwise(&matrix));
        Ok(Self { corpus, vectorizer, matrix, similarity, fingerprint })
    }

    /// Load a model directory written by the indexer.
    pub fn load(paths: &ModelPaths, options: &EngineOptions) -> RecommendResult<Self> {
        tracing::info!(root = %paths.root.display(), "loading model artifacts");
        let corpus = persist::load_corpus(paths).map_err(RecommendError::data_load)?;
        let state = persist::load_vectorizer(paths).map_err(RecommendError::data_load)?;
        let vectorizer = TfidfVectorizer::from_state(state)?;

        let fingerprint = persist::fingerprint(corpus.movies(), vectorizer.state())
            .map_err(RecommendError::data_load)?;
        let indexed = match persist::load_meta(paths) {
            Ok(meta) if meta.version != persist::FORMAT_VERSION => {
                tracing::warn!(found = meta.version, supported = persist::FORMAT_VERSION, "model was indexed by another format version");
                false
            }
            Ok(meta) if meta.fingerprint == fingerprint => true,
            Ok(meta) => {
                tracing::warn!(expected = %meta.fingerprint, actual = %fingerprint, "model files differ from the indexed build");
                false
            }
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "no usable meta file");
                false
            }
        };

        let matrix = if indexed && paths.tfidf().exists() {
            persist::load_matrix(paths).map_err(RecommendError::data_load)?
        } else {
            tracing::info!("transforming corpus instead of using the stored tf-idf matrix");
            vectorizer.transform(&corpus.feature_texts())
        };
        check_shape(&corpus, &vectorizer, &matrix)?;

        let similarity = if options.lazy_similarity {
            None
        } else {
            let cache = options.similarity_cache.clone().unwrap_or_else(|| paths.similarity());
            Some(load_or_generate_similarity(&cache, &fingerprint, &matrix))
        };

        tracing::info!(
            num_movies = corpus.len(),
            num_terms = vectorizer.vocabulary_len(),
            precomputed = similarity.is_some(),
            "models loaded"
        );
        Ok(Self { corpus, vectorizer, matrix, similarity, fingerprint })
    }

    pub fn corpus(&self) -> &Corpus { &self.corpus }
    pub fn similarity_matrix(&self) -> Option<&SimilarityMatrix> { self.similarity.as_ref() }
    pub fn fingerprint(&self) -> &str { &self.fingerprint }
    pub fn len(&self) -> usize { self.corpus.len() }
    pub fn is_empty(&self) -> bool { self.corpus.is_empty() }

    /// Rank the corpus against a profile built from genres and favorite titles.
    pub fn recommend_by_profile(
        &self,
        genres: &[String],
        favorites: &[String],
        n: usize,
    ) -> RecommendResult<Vec<Recommendation>> {
        let parts: Vec<&str> = genres
            .iter()
            .chain(favorites)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        if parts.is_empty() {
            return Err(RecommendError::InvalidInput(
                "at least one genre or favorite movie must be provided".into(),
            ));
        }
        let query = self.vectorizer.transform_one(&parts.join(" "));
        if query.is_zero() {
            tracing::debug!(profile = %parts.join(" "), "profile has no known terms");
        }
        let scores = similarity(&query, &self.matrix);
        self.to_recommendations(top_n(&scores, None, n))
    }

    /// Movies most similar to `movie_id`, never including itself.
    pub fn recommend_by_movie(&self, movie_id: MovieId, n: usize) -> RecommendResult<Vec<Recommendation>> {
        let row = self.corpus.index_of(movie_id).ok_or(RecommendError::NotFound(movie_id))?;
        let ranked = match &self.similarity {
            Some(sim) => {
                let scores = sim
                    .row(row)
                    .ok_or_else(|| RecommendError::Internal(format!("no similarity row {row}")))?;
                top_n(scores, Some(row), n)
            }
            None => {
                let query = self
                    .matrix
                    .row(row)
                    .ok_or_else(|| RecommendError::Internal(format!("no tf-idf row {row}")))?;
                top_n(&similarity(query, &self.matrix), Some(row), n)
            }
        };
        self.to_recommendations(ranked)
    }

    /// Case-insensitive title substring search. No match is an empty list.
    pub fn search_by_title(&self, needle: &str) -> RecommendResult<Vec<MovieSummary>> {
        let needle = needle.trim();
        if needle.is_empty() {
            return Err(RecommendError::InvalidInput("title query must not be empty".into()));
        }
        Ok(self.corpus.search_title(needle).into_iter().map(MovieSummary::from).collect())
    }

    pub fn movie(&self, movie_id: MovieId) -> RecommendResult<MovieSummary> {
        self.corpus
            .index_of(movie_id)
            .and_then(|row| self.corpus.get(row))
            .map(MovieSummary::from)
            .ok_or(RecommendError::NotFound(movie_id))
    }

    fn to_recommendations(&self, ranked: Vec<Ranked>) -> RecommendResult<Vec<Recommendation>> {
        ranked
            .into_iter()
            .enumerate()
            .map(|(pos, r)| {
                let m = self
                    .corpus
                    .get(r.index)
                    .ok_or_else(|| RecommendError::Internal(format!("ranked row {} outside corpus", r.index)))?;
                Ok(Recommendation {
                    movie_id: m.id,
                    title: m.title.clone(),
                    genres: m.genres.clone(),
                    similarity: r.score,
                    rank: pos + 1,
                })
            })
            .collect()
    }
}

fn check_shape(corpus: &Corpus, vectorizer: &TfidfVectorizer, matrix: &SparseMatrix) -> RecommendResult<()> {
    if matrix.n_rows() != corpus.len() {
        return Err(RecommendError::DataLoad(format!(
            "tf-idf matrix has {} rows but corpus has {} movies",
            matrix.n_rows(),
            corpus.len()
        )));
    }
    if matrix.n_cols != vectorizer.vocabulary_len() {
        return Err(RecommendError::DataLoad(format!(
            "tf-idf matrix has {} columns but vocabulary has {} terms",
            matrix.n_cols,
            vectorizer.vocabulary_len()
        )));
    }
    Ok(())
}

/// Reuse the cache when it was built for this exact model, otherwise regenerate and try to persist.
fn load_or_generate_similarity(cache: &std::path::Path, fingerprint: &str, matrix: &SparseMatrix) -> SimilarityMatrix {
    match persist::load_similarity(cache, fingerprint, matrix.n_rows()) {
        Ok(Some(sim)) => {
            tracing::info!(path = %cache.display(), "loaded similarity matrix from cache");
            return sim;
        }
        Ok(None) => tracing::info!("generating similarity matrix"),
        Err(e) => tracing::warn!(error = %format!("{e:#}"), "unreadable similarity cache, regenerating"),
    }
    let sim = pairwise(matrix);
    tracing::info!(rows = sim.dim(), cols = sim.dim(), "similarity matrix generated");
    if let Err(e) = persist::save_similarity(cache, fingerprint, &sim) {
        tracing::warn!(path = %cache.display(), error = %format!("{e:#}"), "could not save similarity matrix");
    }
    sim
}
