use crate::sparse::SparseMatrix;
use crate::TermId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Posting {
    pub row: u32,
    pub weight: f32,
}

/// Term → rows containing it. Used to accumulate dot products over shared terms only.
#[derive(Debug, Default)]
pub struct InvertedIndex {
    postings: Vec<Vec<Posting>>, // indexed by term id, each sorted by row
}

impl InvertedIndex {
    pub fn build(matrix: &SparseMatrix) -> Self {
        let mut postings: Vec<Vec<Posting>> = vec![Vec::new(); matrix.n_cols];
        for (row, vec) in matrix.rows.iter().enumerate() {
            for (tid, weight) in vec.iter() {
                if let Some(list) = postings.get_mut(tid as usize) {
                    list.push(Posting { row: row as u32, weight });
                }
            }
        }
        Self { postings }
    }

    pub fn postings(&self, term: TermId) -> &[Posting] {
        self.postings.get(term as usize).map(Vec::as_slice).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse::SparseVector;

    #[test]
    fn postings_sorted_by_row() {
        let m = SparseMatrix::new(
            3,
            vec![
                SparseVector::from_pairs(vec![(0, 1.0), (2, 1.0)]),
                SparseVector::from_pairs(vec![(2, 0.5)]),
            ],
        );
        let idx = InvertedIndex::build(&m);
        assert_eq!(idx.postings(2), &[Posting { row: 0, weight: 1.0 }, Posting { row: 1, weight: 0.5 }]);
        assert!(idx.postings(1).is_empty());
        assert!(idx.postings(99).is_empty());
    }
}
