//! Dot-product scoring and top-k selection.

use crate::error::{ModelError, Result};
use ndarray::{ArrayView1, ArrayView2};
use std::cmp::Ordering;

/// Score `query` against every row of `table`
pub fn scores(query: ArrayView1<f32>, table: ArrayView2<f32>) -> Result<Vec<f32>> {
    if query.len() != table.ncols() {
        return Err(ModelError::mismatch(
            "query vector length",
            table.ncols(),
            query.len(),
        ));
    }
    Ok(table.dot(&query).to_vec())
}

/// Descending score, ties broken by ascending index
fn rank(scores: &[f32], a: usize, b: usize) -> Ordering {
    scores[b].total_cmp(&scores[a]).then(a.cmp(&b))
}

/// Indices of the `k` highest scores, best first.
///
/// Returns `min(k, scores.len())` indices.
pub fn top_k(scores: &[f32], k: usize) -> Vec<usize> {
    let k = k.min(scores.len());
    if k == 0 {
        return Vec::new();
    }

    let mut indices: Vec<usize> = (0..scores.len()).collect();
    if k < indices.len() {
        indices.select_nth_unstable_by(k - 1, |&a, &b| rank(scores, a, b));
        indices.truncate(k);
    }
    indices.sort_unstable_by(|&a, &b| rank(scores, a, b));
    indices
}

/// Like [`top_k`], paired with each score
pub fn top_k_scored(scores: &[f32], k: usize) -> Vec<(usize, f32)> {
    top_k(scores, k)
        .into_iter()
        .map(|idx| (idx, scores[idx]))
        .collect()
}

/// Top-`k` item indices for a user representation
pub fn score_user_against_items(
    user_vector: ArrayView1<f32>,
    item_table: ArrayView2<f32>,
    k: usize,
) -> Result<Vec<usize>> {
    Ok(top_k(&scores(user_vector, item_table)?, k))
}

/// Top-`k` user indices for an item representation
pub fn score_item_against_users(
    item_vector: ArrayView1<f32>,
    user_table: ArrayView2<f32>,
    k: usize,
) -> Result<Vec<usize>> {
    Ok(top_k(&scores(item_vector, user_table)?, k))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::EmbeddingStore;
    use ndarray::array;

    #[test]
    fn test_top_k_orders_descending() {
        let scores = [0.1, 0.9, 0.5, -0.3, 0.7];
        assert_eq!(top_k(&scores, 3), vec![1, 4, 2]);
        assert_eq!(top_k_scored(&scores, 2), vec![(1, 0.9), (4, 0.7)]);
    }

    #[test]
    fn test_top_k_ties_prefer_lower_index() {
        let scores = [0.5, 1.0, 0.5, 1.0, 0.5];
        assert_eq!(top_k(&scores, 3), vec![1, 3, 0]);
        assert_eq!(top_k(&scores, 5), vec![1, 3, 0, 2, 4]);
    }

    #[test]
    fn test_top_k_larger_than_candidates() {
        let scores = [0.2, 0.4, 0.1, 0.3, 0.0];
        assert_eq!(top_k(&scores, 10), vec![1, 3, 0, 2, 4]);
    }

    #[test]
    fn test_top_k_zero_or_empty() {
        assert!(top_k(&[1.0, 2.0], 0).is_empty());
        assert!(top_k(&[], 5).is_empty());
    }

    #[test]
    fn test_scores_dot_products() {
        let table = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
        let query = array![2.0, 3.0];
        assert_eq!(scores(query.view(), table.view()).unwrap(), vec![2.0, 3.0, 5.0]);

        let short = array![1.0];
        assert!(scores(short.view(), table.view()).is_err());
    }

    #[test]
    fn test_score_store_directions() {
        let store = EmbeddingStore::new(
            array![[1.0, 0.0], [0.0, 2.0]],
            array![[1.0, 1.0], [3.0, 0.0], [0.0, 0.0]],
        )
        .unwrap();
        let user = store.user_vector(0).unwrap();
        let item = store.item_vector(0).unwrap();

        assert_eq!(score_user_against_items(user, store.items(), 2).unwrap(), vec![1, 0]);
        assert_eq!(score_item_against_users(item, store.users(), 5).unwrap(), vec![1, 0]);
        assert!(matches!(
            score_user_against_items(user, store.items().t(), 1),
            Err(ModelError::DimensionMismatch { expected: 3, found: 2, .. })
        ));
    }
}
