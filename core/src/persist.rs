use crate::movie::{read_corpus_table, write_corpus_table, Corpus, Movie};
use crate::similarity::SimilarityMatrix;
use crate::sparse::SparseMatrix;
use crate::vectorizer::{TfidfVectorizer, VectorizerState};
use crate::MovieId;
use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::collections::BTreeMap;
use std::fs::{self, create_dir_all, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_movies: u32,
    pub num_terms: u32,
    pub created_at: String,
    pub version: u32,
    pub fingerprint: String,
}

#[derive(Serialize)]
struct SimilarityCacheRef<'a> {
    fingerprint: &'a str,
    n: u64,
    scores: &'a [f32],
}

#[derive(Deserialize)]
struct SimilarityCacheFile {
    fingerprint: String,
    n: u64,
    scores: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct ModelPaths {
    pub root: PathBuf,
}

impl ModelPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn corpus(&self) -> PathBuf { self.root.join("movies.csv") }
    pub fn id_map(&self) -> PathBuf { self.root.join("id_map.json") }
    pub fn vectorizer(&self) -> PathBuf { self.root.join("vectorizer.bin") }
    pub fn tfidf(&self) -> PathBuf { self.root.join("tfidf.bin") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    pub fn similarity(&self) -> PathBuf { self.root.join("similarity.bin") }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    let mut f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    Ok(buf)
}

pub fn save_vectorizer(paths: &ModelPaths, state: &VectorizerState) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.vectorizer())?;
    let bytes = bincode::serialize(state)?;
    f.write_all(&bytes)?;
    Ok(())
}

pub fn load_vectorizer(paths: &ModelPaths) -> Result<VectorizerState> {
    let buf = read_bytes(&paths.vectorizer())?;
    let state = bincode::deserialize(&buf).context("decoding vectorizer state")?;
    Ok(state)
}

pub fn save_matrix(paths: &ModelPaths, matrix: &SparseMatrix) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut w = BufWriter::new(File::create(paths.tfidf())?);
    bincode::serialize_into(&mut w, matrix)?;
    w.flush()?;
    Ok(())
}

pub fn load_matrix(paths: &ModelPaths) -> Result<SparseMatrix> {
    let buf = read_bytes(&paths.tfidf())?;
    let matrix = bincode::deserialize(&buf).context("decoding tf-idf matrix")?;
    Ok(matrix)
}

pub fn save_id_map(paths: &ModelPaths, map: &BTreeMap<usize, MovieId>) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.id_map())?;
    let json = serde_json::to_string_pretty(map)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_id_map(paths: &ModelPaths) -> Result<BTreeMap<usize, MovieId>> {
    let buf = read_bytes(&paths.id_map())?;
    let map = serde_json::from_slice(&buf).context("decoding id mapping")?;
    Ok(map)
}

pub fn save_meta(paths: &ModelPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &ModelPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta()).with_context(|| format!("opening {}", paths.meta().display()))?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// SHA-1 over the corpus (ids and feature texts in row order) and the vectorizer state.
pub fn fingerprint(movies: &[Movie], state: &VectorizerState) -> Result<String> {
    let mut hasher = Sha1::new();
    for m in movies {
        hasher.update(m.id.to_le_bytes());
        hasher.update((m.feature_text.len() as u64).to_le_bytes());
        hasher.update(m.feature_text.as_bytes());
    }
    hasher.update(bincode::serialize(state)?);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Write the whole model directory for a fitted corpus. Returns the written meta.
pub fn save_model(
    paths: &ModelPaths,
    corpus: &Corpus,
    vectorizer: &TfidfVectorizer,
    matrix: &SparseMatrix,
) -> Result<MetaFile> {
    create_dir_all(&paths.root)?;
    write_corpus_table(&paths.corpus(), corpus.movies())?;
    save_id_map(paths, &corpus.id_map())?;
    save_vectorizer(paths, vectorizer.state())?;
    save_matrix(paths, matrix)?;
    let meta = MetaFile {
        num_movies: u32::try_from(corpus.len()).context("corpus too large for the meta file")?,
        num_terms: u32::try_from(vectorizer.vocabulary_len()).context("vocabulary too large for the meta file")?,
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default(),
        version: FORMAT_VERSION,
        fingerprint: fingerprint(corpus.movies(), vectorizer.state())?,
    };
    save_meta(paths, &meta)?;
    Ok(meta)
}

/// Load the corpus table and check it against the id mapping.
pub fn load_corpus(paths: &ModelPaths) -> Result<Corpus> {
    let movies = read_corpus_table(&paths.corpus())?;
    let id_map = load_id_map(paths)?;
    Corpus::with_id_map(movies, &id_map)
}

/// Write the similarity cache through a temp file so readers never see a partial matrix.
pub fn save_similarity(path: &Path, fingerprint: &str, matrix: &SimilarityMatrix) -> Result<()> {
    if let Some(dir) = path.parent() {
        create_dir_all(dir)?;
    }
    let tmp = path.with_extension("bin.tmp");
    let file = SimilarityCacheRef { fingerprint, n: matrix.dim() as u64, scores: matrix.scores() };
    {
        let mut w = BufWriter::new(File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?);
        bincode::serialize_into(&mut w, &file)?;
        w.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Load a cached similarity matrix. `Ok(None)` when the file is absent or keyed to another model.
pub fn load_similarity(path: &Path, fingerprint: &str, expected_dim: usize) -> Result<Option<SimilarityMatrix>> {
    if !path.exists() {
        return Ok(None);
    }
    let buf = read_bytes(path)?;
    let file: SimilarityCacheFile = bincode::deserialize(&buf).context("decoding similarity cache")?;
    if file.fingerprint != fingerprint || file.n as usize != expected_dim {
        tracing::info!(cached = %file.fingerprint, current = %fingerprint, "similarity cache is stale");
        return Ok(None);
    }
    let matrix = SimilarityMatrix::from_parts(file.n as usize, file.scores)
        .ok_or_else(|| anyhow!("similarity cache has the wrong number of scores"))?;
    check_scores(&matrix)?;
    Ok(Some(matrix))
}

/// Every score finite and in [0, 1], every diagonal entry exactly 1.0.
fn check_scores(matrix: &SimilarityMatrix) -> Result<()> {
    let n = matrix.dim();
    if let Some(pos) = matrix.scores().iter().position(|s| !(0.0..=1.0).contains(s)) {
        bail!("similarity cache score at ({}, {}) is {}", pos / n, pos % n, matrix.scores()[pos]);
    }
    if let Some(i) = (0..n).find(|&i| matrix.get(i, i) != Some(1.0)) {
        bail!("similarity cache diagonal at row {i} is not 1.0");
    }
    Ok(())
}
