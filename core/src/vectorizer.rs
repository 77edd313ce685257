//! TF-IDF vectorizer.
//!
//! Weighting is fixed per fitted model and travels with its persisted state:
//!
//! * tf is the raw term count, or `1 + ln(count)` with `sublinear_tf`;
//! * idf is `ln((1 + N) / (1 + df)) + 1` ([`IdfSmoothing::Smooth`], default)
//!   or `ln(N / df)` ([`IdfSmoothing::Plain`]);
//! * every row is L2-normalized.
//!
//! Scores from two models are only comparable when both use the same weighting.

use crate::error::{RecommendError, RecommendResult};
use crate::sparse::{SparseMatrix, SparseVector};
use crate::tokenizer::{Tokenizer, TokenizerConfig};
use crate::TermId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdfSmoothing {
    #[default]
    Smooth,
    Plain,
}

impl IdfSmoothing {
    pub fn idf(self, num_docs: u32, df: u32) -> f32 {
        let n = num_docs as f32;
        let df = df.max(1) as f32;
        match self {
            IdfSmoothing::Smooth => ((1.0 + n) / (1.0 + df)).ln() + 1.0,
            IdfSmoothing::Plain => (n / df).ln(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorizerConfig {
    pub tokenizer: TokenizerConfig,
    pub idf: IdfSmoothing,
    pub sublinear_tf: bool,
}

/// Everything needed to rebuild a fitted vectorizer. Vocabulary is sorted, so column `i` is `vocabulary[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorizerState {
    pub config: VectorizerConfig,
    pub num_docs: u32,
    pub vocabulary: Vec<String>,
    pub df: Vec<u32>,
    pub idf: Vec<f32>,
}

pub struct TfidfVectorizer {
    state: VectorizerState,
    dictionary: HashMap<String, TermId>,
    tokenizer: Tokenizer,
}

impl TfidfVectorizer {
    /// Fit over the corpus texts. Fails on an empty corpus or an empty vocabulary.
    pub fn fit<S: AsRef<str>>(texts: &[S], config: VectorizerConfig) -> RecommendResult<Self> {
        Self::fit_transform(texts, config).map(|(v, _)| v)
    }

    /// Fit and return the corpus matrix in one pass over the tokens.
    pub fn fit_transform<S: AsRef<str>>(
        texts: &[S],
        config: VectorizerConfig,
    ) -> RecommendResult<(Self, SparseMatrix)> {
        if texts.is_empty() {
            return Err(RecommendError::InvalidInput("cannot fit a vectorizer on an empty corpus".into()));
        }
        let tokenizer = Tokenizer::new(config.tokenizer.clone());
        let docs: Vec<Vec<String>> = texts.iter().map(|t| tokenizer.tokenize(t.as_ref())).collect();

        let mut df_by_term: BTreeMap<&str, u32> = BTreeMap::new();
        for tokens in &docs {
            let mut seen: Vec<&str> = tokens.iter().map(String::as_str).collect();
            seen.sort_unstable();
            seen.dedup();
            for term in seen {
                *df_by_term.entry(term).or_insert(0) += 1;
            }
        }
        if df_by_term.is_empty() {
            return Err(RecommendError::InvalidInput(
                "corpus has no vocabulary after stop-word removal".into(),
            ));
        }

        let num_docs = u32::try_from(docs.len())
            .map_err(|_| RecommendError::InvalidInput("corpus too large".into()))?;
        let vocabulary: Vec<String> = df_by_term.keys().map(|t| t.to_string()).collect();
        let df: Vec<u32> = df_by_term.values().copied().collect();
        let idf: Vec<f32> = df.iter().map(|&d| config.idf.idf(num_docs, d)).collect();

        let vectorizer = Self::from_state(VectorizerState { config, num_docs, vocabulary, df, idf })?;
        let rows = docs.iter().map(|tokens| vectorizer.weigh(tokens)).collect();
        let matrix = SparseMatrix::new(vectorizer.vocabulary_len(), rows);
        if matrix.nnz() == 0 {
            return Err(RecommendError::InvalidInput(
                "every term has zero idf weight; the corpus cannot separate movies".into(),
            ));
        }
        tracing::debug!(num_docs, num_terms = matrix.n_cols, nnz = matrix.nnz(), "fitted tf-idf vectorizer");
        Ok((vectorizer, matrix))
    }

    /// Rebuild from persisted state, checking that its tables line up.
    pub fn from_state(state: VectorizerState) -> RecommendResult<Self> {
        let n = state.vocabulary.len();
        if state.df.len() != n || state.idf.len() != n {
            return Err(RecommendError::DataLoad(format!(
                "vectorizer tables disagree: {} terms, {} df, {} idf",
                n,
                state.df.len(),
                state.idf.len()
            )));
        }
        let mut dictionary = HashMap::with_capacity(n);
        for (i, term) in state.vocabulary.iter().enumerate() {
            let tid = i as TermId;
            if dictionary.insert(term.clone(), tid).is_some() {
                return Err(RecommendError::DataLoad(format!("duplicate vocabulary term {term:?}")));
            }
        }
        let tokenizer = Tokenizer::new(state.config.tokenizer.clone());
        Ok(Self { state, dictionary, tokenizer })
    }

    pub fn state(&self) -> &VectorizerState { &self.state }
    pub fn vocabulary_len(&self) -> usize { self.state.vocabulary.len() }
    pub fn term_id(&self, term: &str) -> Option<TermId> { self.dictionary.get(term).copied() }

    /// Vectorize one text. Terms outside the vocabulary are ignored.
    pub fn transform_one(&self, text: &str) -> SparseVector {
        self.weigh(&self.tokenizer.tokenize(text))
    }

    pub fn transform<S: AsRef<str>>(&self, texts: &[S]) -> SparseMatrix {
        let rows = texts.iter().map(|t| self.transform_one(t.as_ref())).collect();
        SparseMatrix::new(self.vocabulary_len(), rows)
    }

    fn weigh(&self, tokens: &[String]) -> SparseVector {
        let mut counts: HashMap<TermId, u32> = HashMap::new();
        for token in tokens {
            if let Some(tid) = self.term_id(token) {
                *counts.entry(tid).or_insert(0) += 1;
            }
        }
        let sublinear = self.state.config.sublinear_tf;
        let pairs = counts
            .into_iter()
            .map(|(tid, raw)| {
                let tf = if sublinear { 1.0 + (raw as f32).ln() } else { raw as f32 };
                (tid, tf * self.state.idf[tid as usize])
            })
            .collect();
        let mut v = SparseVector::from_pairs(pairs);
        v.normalize();
        v
    }
}
