//! Graph propagation (NGCF with an attention gate).
//!
//! ## Algorithm, per layer, on the current table `emb`
//! 1. `side = A x emb`
//! 2. `gate = sigmoid(attn([emb | side]))`
//! 3. `W(gate * side) + W_self(emb * side)`
//! 4. LeakyReLU(0.2), frozen batch norm
//! 5. Row-wise L2 normalization; the result feeds the next layer
//!
//! Dropout only exists at training time and has no counterpart here, so
//! the forward pass is deterministic.

use crate::adjacency::SparseAdjacency;
use crate::error::{ModelError, Result};
use crate::params::{LayerParams, ModelParams};
use crate::store::EmbeddingStore;
use ndarray::{Array2, ArrayView2, Axis};
use std::time::Instant;
use tracing::{debug, info, instrument};

pub const LEAKY_RELU_SLOPE: f32 = 0.2;

/// Lower bound on the divisor in row normalization
const NORM_EPS: f32 = 1e-12;

/// Runs the frozen model over the graph
#[derive(Debug, Clone)]
pub struct Propagator {
    params: ModelParams,
}

impl Propagator {
    pub fn new(params: ModelParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    /// Per-layer embedding tables over all nodes, layer 0 (the initial
    /// embeddings) first. Length is `num_layers + 1`.
    #[instrument(skip_all, fields(nodes = adjacency.num_nodes(), layers = self.params.num_layers()))]
    pub fn layer_outputs(&self, adjacency: &SparseAdjacency) -> Result<Vec<Array2<f32>>> {
        let ego = self.params.ego_embeddings()?;
        if adjacency.num_nodes() != ego.nrows() {
            return Err(ModelError::mismatch(
                "adjacency vs embedding table",
                ego.nrows(),
                adjacency.num_nodes(),
            ));
        }

        let mut outputs = Vec::with_capacity(self.params.num_layers() + 1);
        outputs.push(ego);
        for (k, layer) in self.params.layers().iter().enumerate() {
            let next = propagate_layer(layer, outputs[k].view(), adjacency)?;
            debug!("Propagated layer {}", k + 1);
            outputs.push(next);
        }
        Ok(outputs)
    }

    /// Run the full forward pass once and freeze the result
    pub fn run(&self, adjacency: &SparseAdjacency) -> Result<EmbeddingStore> {
        let start = Instant::now();
        let layers = self.layer_outputs(adjacency)?;
        let store = EmbeddingStore::from_layers(&layers, self.params.num_users())?;
        info!(
            "Propagation finished in {:.2?}: {} users, {} items, width {}",
            start.elapsed(),
            store.num_users(),
            store.num_items(),
            store.width()
        );
        Ok(store)
    }
}

/// One propagation step
pub fn propagate_layer(
    layer: &LayerParams,
    emb: ArrayView2<f32>,
    adjacency: &SparseAdjacency,
) -> Result<Array2<f32>> {
    let side = adjacency.matmul(emb)?;

    let gate = layer.attn.gate(emb, side.view());
    let gated = &side * &gate.insert_axis(Axis(1));
    let bilinear = &emb * &side;

    let mut out = layer.w.forward(gated.view());
    out += &layer.w_self.forward(bilinear.view());
    out.mapv_inplace(leaky_relu);
    layer.norm.apply(&mut out);

    l2_normalize_rows(&mut out);
    Ok(out)
}

pub(crate) fn sigmoid(z: f32) -> f32 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

fn leaky_relu(x: f32) -> f32 {
    if x >= 0.0 { x } else { LEAKY_RELU_SLOPE * x }
}

/// Scale each row to unit L2 norm. All-zero rows stay zero.
pub fn l2_normalize_rows(table: &mut Array2<f32>) {
    for mut row in table.rows_mut() {
        let norm = row.dot(&row).sqrt();
        let divisor = norm.max(NORM_EPS);
        row.mapv_inplace(|v| v / divisor);
    }
}
