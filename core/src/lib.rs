pub mod engine;
pub mod error;
pub mod index;
pub mod movie;
pub mod persist;
pub mod ranker;
pub mod recommender;
pub mod similarity;
pub mod sparse;
pub mod tokenizer;
pub mod vectorizer;

pub type TermId = u32;
pub type MovieId = i64;

pub use engine::{Engine, EngineOptions, MovieSummary, Recommendation};
pub use error::{RecommendError, RecommendResult};
pub use movie::{Corpus, CorpusColumns, Movie};
pub use recommender::{Readiness, Recommender};
pub use vectorizer::{IdfSmoothing, TfidfVectorizer, VectorizerConfig};
