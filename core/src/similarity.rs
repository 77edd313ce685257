use crate::index::InvertedIndex;
use crate::sparse::{SparseMatrix, SparseVector};

/// Cosine similarity of two sparse vectors, 0 when either has zero norm, clamped to [0, 1].
pub fn cosine(a: &SparseVector, b: &SparseVector) -> f32 {
    let denom = a.norm() * b.norm();
    if denom == 0.0 {
        return 0.0;
    }
    clamp_score(a.dot(b) / denom)
}

fn clamp_score(s: f32) -> f32 {
    if s.is_nan() { 0.0 } else { s.clamp(0.0, 1.0) }
}

/// Score `query` against every row of `matrix`.
pub fn similarity(query: &SparseVector, matrix: &SparseMatrix) -> Vec<f32> {
    let qn = query.norm();
    matrix
        .rows
        .iter()
        .map(|row| {
            let denom = qn * row.norm();
            if denom == 0.0 { 0.0 } else { clamp_score(query.dot(row) / denom) }
        })
        .collect()
}

/// Dense symmetric N×N score matrix, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    n: usize,
    scores: Vec<f32>,
}

impl SimilarityMatrix {
    pub fn from_parts(n: usize, scores: Vec<f32>) -> Option<Self> {
        (n.checked_mul(n) == Some(scores.len())).then_some(Self { n, scores })
    }

    pub fn dim(&self) -> usize { self.n }

    pub fn row(&self, i: usize) -> Option<&[f32]> {
        (i < self.n).then(|| &self.scores[i * self.n..(i + 1) * self.n])
    }

    pub fn get(&self, i: usize, j: usize) -> Option<f32> {
        self.row(i).and_then(|r| r.get(j).copied())
    }

    pub fn scores(&self) -> &[f32] { &self.scores }
}

/// All-pairs cosine similarity. Diagonal is 1.0.
///
/// Each row accumulates partial dot products through the postings of its own
/// terms, so work is proportional to co-occurring terms rather than N·V.
pub fn pairwise(matrix: &SparseMatrix) -> SimilarityMatrix {
    let n = matrix.n_rows();
    let index = InvertedIndex::build(matrix);
    let norms: Vec<f32> = matrix.rows.iter().map(SparseVector::norm).collect();
    let mut scores = vec![0.0f32; n * n];
    let mut acc = vec![0.0f32; n];

    for (i, row) in matrix.rows.iter().enumerate() {
        acc.iter_mut().for_each(|x| *x = 0.0);
        for (tid, w) in row.iter() {
            for p in index.postings(tid) {
                acc[p.row as usize] += w * p.weight;
            }
        }
        let out = &mut scores[i * n..(i + 1) * n];
        for j in 0..n {
            let denom = norms[i] * norms[j];
            out[j] = if denom == 0.0 { 0.0 } else { clamp_score(acc[j] / denom) };
        }
        out[i] = 1.0;
    }

    // Mirror the upper triangle so the matrix is exactly symmetric.
    for i in 0..n {
        for j in (i + 1)..n {
            scores[j * n + i] = scores[i * n + j];
        }
    }
    SimilarityMatrix { n, scores }
}
