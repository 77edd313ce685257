use crate::TermId;
use serde::{Deserialize, Serialize};

/// Sparse row: term ids strictly ascending, one weight per id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub indices: Vec<TermId>,
    pub values: Vec<f32>,
}

impl SparseVector {
    /// Build from unsorted (term, weight) pairs; zero weights are dropped.
    pub fn from_pairs(mut pairs: Vec<(TermId, f32)>) -> Self {
        pairs.sort_by_key(|(t, _)| *t);
        let mut v = SparseVector::default();
        for (t, w) in pairs {
            if w == 0.0 { continue; }
            v.indices.push(t);
            v.values.push(w);
        }
        v
    }

    pub fn nnz(&self) -> usize { self.indices.len() }
    pub fn is_zero(&self) -> bool { self.indices.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (TermId, f32)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    pub fn norm(&self) -> f32 {
        self.values.iter().map(|w| w * w).sum::<f32>().sqrt()
    }

    /// Scale to unit length in place. A zero vector stays zero.
    pub fn normalize(&mut self) {
        let norm = self.norm();
        if norm == 0.0 { return; }
        for w in self.values.iter_mut() { *w /= norm; }
    }

    /// Merge-join dot product over the shared term ids.
    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (mut i, mut j) = (0, 0);
        let mut acc = 0.0f32;
        while i < self.indices.len() && j < other.indices.len() {
            match self.indices[i].cmp(&other.indices[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    acc += self.values[i] * other.values[j];
                    i += 1;
                    j += 1;
                }
            }
        }
        acc
    }
}

/// Row-major sparse matrix with a fixed column count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseMatrix {
    pub n_cols: usize,
    pub rows: Vec<SparseVector>,
}

impl SparseMatrix {
    pub fn new(n_cols: usize, rows: Vec<SparseVector>) -> Self { Self { n_cols, rows } }
    pub fn n_rows(&self) -> usize { self.rows.len() }
    pub fn row(&self, i: usize) -> Option<&SparseVector> { self.rows.get(i) }
    pub fn nnz(&self) -> usize { self.rows.iter().map(SparseVector::nnz).sum() }
}
