//! Sparse normalized adjacency over the combined user+item node space.
//!
//! Stored in CSR form. Users occupy rows `[0, num_users)`, items occupy
//! `[num_users, num_users + num_items)`.

use crate::error::{ModelError, Result};
use data_loader::AdjacencyEntry;
use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SparseAdjacency {
    num_nodes: usize,
    /// `indptr[r]..indptr[r + 1]` spans row `r` in `indices`/`values`
    indptr: Vec<usize>,
    indices: Vec<usize>,
    values: Vec<f32>,
}

impl SparseAdjacency {
    /// Build from COO triplets. Duplicate coordinates are summed.
    pub fn from_entries(num_nodes: usize, entries: &[AdjacencyEntry]) -> Result<Self> {
        if let Some(entry) = entries
            .iter()
            .find(|e| e.row >= num_nodes || e.col >= num_nodes)
        {
            return Err(ModelError::mismatch(
                format!("adjacency entry ({}, {})", entry.row, entry.col),
                num_nodes,
                entry.row.max(entry.col) + 1,
            ));
        }

        let mut sorted = entries.to_vec();
        sorted.sort_by(|a, b| (a.row, a.col).cmp(&(b.row, b.col)));

        let mut indptr = vec![0usize; num_nodes + 1];
        let mut indices = Vec::with_capacity(sorted.len());
        let mut values = Vec::with_capacity(sorted.len());
        let mut previous: Option<(usize, usize)> = None;

        for entry in sorted {
            if previous == Some((entry.row, entry.col)) {
                if let Some(last) = values.last_mut() {
                    *last += entry.weight;
                }
                continue;
            }
            indices.push(entry.col);
            values.push(entry.weight);
            indptr[entry.row + 1] += 1;
            previous = Some((entry.row, entry.col));
        }
        for r in 0..num_nodes {
            indptr[r + 1] += indptr[r];
        }

        debug!("Built CSR adjacency: {} nodes, {} nonzeros", num_nodes, values.len());
        Ok(Self {
            num_nodes,
            indptr,
            indices,
            values,
        })
    }

    /// Build the symmetric normalized bipartite graph `D^-1/2 A D^-1/2`
    /// from `(user_idx, item_idx)` interactions.
    ///
    /// Repeated interactions count once. Nodes without interactions get an
    /// empty row.
    pub fn from_interactions(
        num_users: usize,
        num_items: usize,
        interactions: impl IntoIterator<Item = (usize, usize)>,
    ) -> Result<Self> {
        let mut edges = BTreeSet::new();
        for (user, item) in interactions {
            if user >= num_users {
                return Err(ModelError::mismatch("interaction user index", num_users, user + 1));
            }
            if item >= num_items {
                return Err(ModelError::mismatch("interaction item index", num_items, item + 1));
            }
            edges.insert((user, num_users + item));
        }

        let num_nodes = num_users + num_items;
        let mut degree = vec![0u32; num_nodes];
        for &(user_node, item_node) in &edges {
            degree[user_node] += 1;
            degree[item_node] += 1;
        }

        let mut entries = Vec::with_capacity(edges.len() * 2);
        for &(user_node, item_node) in &edges {
            let weight = 1.0 / ((degree[user_node] as f32) * (degree[item_node] as f32)).sqrt();
            entries.push(AdjacencyEntry {
                row: user_node,
                col: item_node,
                weight,
            });
            entries.push(AdjacencyEntry {
                row: item_node,
                col: user_node,
                weight,
            });
        }

        Self::from_entries(num_nodes, &entries)
    }

    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Stored weight at `(row, col)`, zero when absent
    pub fn weight(&self, row: usize, col: usize) -> f32 {
        if row >= self.num_nodes {
            return 0.0;
        }
        let span = self.indptr[row]..self.indptr[row + 1];
        match self.indices[span.clone()].binary_search(&col) {
            Ok(offset) => self.values[span.start + offset],
            Err(_) => 0.0,
        }
    }

    /// COO triplets in row-major order
    pub fn entries(&self) -> Vec<AdjacencyEntry> {
        (0..self.num_nodes)
            .flat_map(|row| {
                (self.indptr[row]..self.indptr[row + 1]).map(move |k| AdjacencyEntry {
                    row,
                    col: self.indices[k],
                    weight: self.values[k],
                })
            })
            .collect()
    }

    /// Sparse x dense product, one output row per node
    pub fn matmul(&self, dense: ArrayView2<f32>) -> Result<Array2<f32>> {
        if dense.nrows() != self.num_nodes {
            return Err(ModelError::mismatch(
                "sparse-dense product",
                self.num_nodes,
                dense.nrows(),
            ));
        }
        let dim = dense.ncols();

        let rows: Vec<Vec<f32>> = (0..self.num_nodes)
            .into_par_iter()
            .map(|row| {
                let mut acc = vec![0.0f32; dim];
                for k in self.indptr[row]..self.indptr[row + 1] {
                    let weight = self.values[k];
                    for (a, &x) in acc.iter_mut().zip(dense.row(self.indices[k]).iter()) {
                        *a += weight * x;
                    }
                }
                acc
            })
            .collect();

        let data: Vec<f32> = rows.into_iter().flatten().collect();
        Ok(Array2::from_shape_vec((self.num_nodes, dim), data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn entry(row: usize, col: usize, weight: f32) -> AdjacencyEntry {
        AdjacencyEntry { row, col, weight }
    }

    #[test]
    fn test_from_entries_sums_duplicates() {
        let adj = SparseAdjacency::from_entries(
            3,
            &[entry(2, 0, 0.25), entry(0, 1, 0.5), entry(2, 0, 0.25)],
        )
        .unwrap();

        assert_eq!(adj.nnz(), 2);
        assert_eq!(adj.weight(2, 0), 0.5);
        assert_eq!(adj.weight(0, 1), 0.5);
        assert_eq!(adj.weight(1, 1), 0.0);
    }

    #[test]
    fn test_out_of_range_entry() {
        let err = SparseAdjacency::from_entries(2, &[entry(0, 2, 1.0)]).unwrap_err();
        assert!(matches!(err, ModelError::DimensionMismatch { expected: 2, found: 3, .. }));
    }

    #[test]
    fn test_matmul() {
        let adj = SparseAdjacency::from_entries(
            3,
            &[entry(0, 1, 1.0), entry(0, 2, 2.0), entry(2, 0, 0.5)],
        )
        .unwrap();
        let dense = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];

        let out = adj.matmul(dense.view()).unwrap();
        assert_eq!(out, array![[13.0f32, 16.0], [0.0, 0.0], [0.5, 1.0]]);
    }

    #[test]
    fn test_matmul_dimension_mismatch() {
        let adj = SparseAdjacency::from_entries(3, &[]).unwrap();
        let dense = Array2::<f32>::zeros((4, 2));
        assert!(matches!(
            adj.matmul(dense.view()),
            Err(ModelError::DimensionMismatch { expected: 3, found: 4, .. })
        ));
    }

    #[test]
    fn test_from_interactions_is_symmetric_normalized() {
        // user 0 -> items 0, 1; user 1 -> item 1 (listed twice)
        let adj = SparseAdjacency::from_interactions(2, 2, vec![(0, 0), (0, 1), (1, 1), (1, 1)])
            .unwrap();

        assert_eq!(adj.num_nodes(), 4);
        assert_eq!(adj.nnz(), 6);
        for e in adj.entries() {
            assert_eq!(adj.weight(e.col, e.row), e.weight);
        }
        // deg(user0) = 2, deg(item1 node 3) = 2
        assert!((adj.weight(0, 3) - 0.5).abs() < 1e-6);
        // deg(user1) = 1, deg(item1) = 2
        assert!((adj.weight(1, 3) - 1.0 / 2f32.sqrt()).abs() < 1e-6);
        // users never link to users
        assert_eq!(adj.weight(0, 1), 0.0);
    }

    #[test]
    fn test_from_interactions_rejects_unknown_item() {
        assert!(SparseAdjacency::from_interactions(1, 1, vec![(0, 1)]).is_err());
    }
}
