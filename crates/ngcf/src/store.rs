//! Frozen final representations, split into user and item tables.

use crate::error::{ModelError, Result};
use ndarray::{Array2, ArrayView1, ArrayView2, Axis, concatenate, s};

/// Read-only embedding tables computed once at startup.
///
/// Row `u` of `users` is the representation of user index `u`; row `i` of
/// `items` is item index `i`. Both tables share the same width.
#[derive(Debug, Clone)]
pub struct EmbeddingStore {
    users: Array2<f32>,
    items: Array2<f32>,
}

impl EmbeddingStore {
    pub fn new(users: Array2<f32>, items: Array2<f32>) -> Result<Self> {
        if users.ncols() != items.ncols() {
            return Err(ModelError::mismatch(
                "item table width",
                users.ncols(),
                items.ncols(),
            ));
        }
        Ok(Self { users, items })
    }

    /// Concatenate per-layer tables along the feature axis, then split at
    /// `num_users`.
    pub fn from_layers(layers: &[Array2<f32>], num_users: usize) -> Result<Self> {
        let first = layers
            .first()
            .ok_or_else(|| ModelError::ModelLoad("no layer outputs to concatenate".to_string()))?;
        let num_nodes = first.nrows();
        if let Some(bad) = layers.iter().find(|l| l.nrows() != num_nodes) {
            return Err(ModelError::mismatch("layer output rows", num_nodes, bad.nrows()));
        }
        if num_users > num_nodes {
            return Err(ModelError::mismatch("user count", num_nodes, num_users));
        }

        let views: Vec<ArrayView2<f32>> = layers.iter().map(|l| l.view()).collect();
        let all = concatenate(Axis(1), &views)?;

        let users = all.slice(s![..num_users, ..]).to_owned();
        let items = all.slice(s![num_users.., ..]).to_owned();
        Self::new(users, items)
    }

    pub fn user_vector(&self, idx: usize) -> Option<ArrayView1<'_, f32>> {
        (idx < self.users.nrows()).then(|| self.users.row(idx))
    }

    pub fn item_vector(&self, idx: usize) -> Option<ArrayView1<'_, f32>> {
        (idx < self.items.nrows()).then(|| self.items.row(idx))
    }

    pub fn users(&self) -> ArrayView2<'_, f32> {
        self.users.view()
    }

    pub fn items(&self) -> ArrayView2<'_, f32> {
        self.items.view()
    }

    pub fn num_users(&self) -> usize {
        self.users.nrows()
    }

    pub fn num_items(&self) -> usize {
        self.items.nrows()
    }

    /// `emb_dim * (num_layers + 1)` for a propagated store
    pub fn width(&self) -> usize {
        self.users.ncols()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_from_layers_concatenates_and_splits() {
        let layer0 = array![[1.0, 0.0], [0.0, 1.0], [2.0, 2.0]];
        let layer1 = array![[0.5, 0.5], [0.1, 0.2], [0.3, 0.4]];

        let store = EmbeddingStore::from_layers(&[layer0, layer1], 1).unwrap();

        assert_eq!(store.num_users(), 1);
        assert_eq!(store.num_items(), 2);
        assert_eq!(store.width(), 4);
        assert_eq!(store.user_vector(0).unwrap(), array![1.0f32, 0.0, 0.5, 0.5]);
        assert_eq!(store.item_vector(1).unwrap(), array![2.0f32, 2.0, 0.3, 0.4]);
        assert!(store.item_vector(2).is_none());
        assert!(store.user_vector(1).is_none());
    }

    #[test]
    fn test_from_layers_rejects_ragged_rows() {
        let layers = [Array2::<f32>::zeros((3, 2)), Array2::<f32>::zeros((4, 2))];
        assert!(matches!(
            EmbeddingStore::from_layers(&layers, 1),
            Err(ModelError::DimensionMismatch { expected: 3, found: 4, .. })
        ));
        assert!(EmbeddingStore::from_layers(&[], 0).is_err());
    }

    #[test]
    fn test_new_requires_equal_width() {
        let users = Array2::<f32>::zeros((2, 3));
        let items = Array2::<f32>::zeros((2, 4));
        assert!(EmbeddingStore::new(users, items).is_err());
    }
}
