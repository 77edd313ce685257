use serde::Serialize;

/// Upper bound on results per query. Larger requests are clamped, not rejected.
pub const MAX_TOP_N: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Ranked {
    pub index: usize,
    pub score: f32,
}

/// Highest scores first, ties by ascending index. `exclude_index` is removed before truncation.
pub fn top_n(scores: &[f32], exclude_index: Option<usize>, n: usize) -> Vec<Ranked> {
    let n = n.min(MAX_TOP_N);
    if n == 0 {
        return Vec::new();
    }
    let mut ranked: Vec<Ranked> = scores
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != exclude_index)
        .map(|(index, &score)| Ranked { index, score })
        .collect();
    let by_rank = |a: &Ranked, b: &Ranked| b.score.total_cmp(&a.score).then(a.index.cmp(&b.index));
    if ranked.len() > n {
        ranked.select_nth_unstable_by(n - 1, by_rank);
        ranked.truncate(n);
    }
    ranked.sort_unstable_by(by_rank);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indices(r: &[Ranked]) -> Vec<usize> { r.iter().map(|x| x.index).collect() }

    #[test]
    fn sorts_descending() {
        let r = top_n(&[0.1, 0.9, 0.5], None, 3);
        assert_eq!(indices(&r), vec![1, 2, 0]);
    }

    #[test]
    fn ties_break_by_index() {
        let r = top_n(&[0.5, 0.7, 0.5, 0.7, 0.5], None, 4);
        assert_eq!(indices(&r), vec![1, 3, 0, 2]);
    }

    #[test]
    fn excludes_before_truncating() {
        let r = top_n(&[1.0, 0.8, 0.6], Some(0), 2);
        assert_eq!(indices(&r), vec![1, 2]);
    }

    #[test]
    fn returns_what_is_available() {
        let r = top_n(&[0.2, 0.4], Some(1), 10);
        assert_eq!(indices(&r), vec![0]);
        assert!(top_n(&[], None, 5).is_empty());
        assert!(top_n(&[0.3], None, 0).is_empty());
    }

    #[test]
    fn clamps_to_max() {
        let scores: Vec<f32> = (0..200).map(|i| i as f32 / 200.0).collect();
        let r = top_n(&scores, None, 1000);
        assert_eq!(r.len(), MAX_TOP_N);
        assert_eq!(r[0].index, 199);
        assert!(r.windows(2).all(|w| w[0].score >= w[1].score));
    }
}
