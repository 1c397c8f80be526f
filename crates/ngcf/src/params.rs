//! Frozen model parameters.
//!
//! `model.json` is deserialized into plain `*File` records and then validated
//! into ndarray-backed bundles. Shapes are checked once here, so the
//! propagation code can assume every layer agrees on `emb_dim`.

use crate::error::{ModelError, Result};
use crate::propagation::sigmoid;
use ndarray::{Array1, Array2, ArrayView2, Axis, s};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

// =============================================================================
// On-disk layout
// =============================================================================

/// File name of the frozen parameters inside an artifact directory
pub const MODEL_FILE: &str = "model.json";

/// A torch-style linear layer: `weight` is `(out, in)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearFile {
    pub weight: Vec<Vec<f32>>,
    pub bias: Vec<f32>,
}

/// Batch-norm parameters and running statistics captured at the end of training
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchNormFile {
    pub weight: Vec<f32>,
    pub bias: Vec<f32>,
    pub running_mean: Vec<f32>,
    pub running_var: Vec<f32>,
    #[serde(default = "default_bn_eps")]
    pub eps: f32,
}

fn default_bn_eps() -> f32 {
    1e-5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerFile {
    pub w: LinearFile,
    pub w_self: LinearFile,
    pub attn: LinearFile,
    pub bn: BatchNormFile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    pub num_users: usize,
    pub num_items: usize,
    pub emb_dim: usize,
    pub num_layers: usize,
    pub user_embedding: Vec<Vec<f32>>,
    pub item_embedding: Vec<Vec<f32>>,
    pub layers: Vec<LayerFile>,
}

// =============================================================================
// Validated parameters
// =============================================================================

/// `y = x W^T + b`
#[derive(Debug, Clone)]
pub struct Linear {
    weight: Array2<f32>,
    bias: Array1<f32>,
}

impl Linear {
    pub fn new(weight: Array2<f32>, bias: Array1<f32>) -> Result<Self> {
        if bias.len() != weight.nrows() {
            return Err(ModelError::mismatch("linear bias", weight.nrows(), bias.len()));
        }
        Ok(Self { weight, bias })
    }

    fn from_file(name: &str, file: &LinearFile, out_dim: usize, in_dim: usize) -> Result<Self> {
        let weight = matrix_from_rows(&format!("{}.weight", name), &file.weight, out_dim, in_dim)?;
        let bias = vector(&format!("{}.bias", name), &file.bias, out_dim)?;
        Self::new(weight, bias)
    }

    pub fn in_dim(&self) -> usize {
        self.weight.ncols()
    }

    pub fn out_dim(&self) -> usize {
        self.weight.nrows()
    }

    /// Apply the map to every row of `x`
    pub fn forward(&self, x: ArrayView2<f32>) -> Array2<f32> {
        x.dot(&self.weight.t()) + &self.bias
    }
}

/// Scalar attention gate over `[emb | side]`.
///
/// The `(1, 2 * emb_dim)` weight is stored as its two halves so the
/// concatenated input never has to be materialized.
#[derive(Debug, Clone)]
pub struct Attention {
    self_weight: Array1<f32>,
    neighbor_weight: Array1<f32>,
    bias: f32,
}

impl Attention {
    pub fn new(self_weight: Array1<f32>, neighbor_weight: Array1<f32>, bias: f32) -> Result<Self> {
        if self_weight.len() != neighbor_weight.len() {
            return Err(ModelError::mismatch(
                "attention weight halves",
                self_weight.len(),
                neighbor_weight.len(),
            ));
        }
        Ok(Self {
            self_weight,
            neighbor_weight,
            bias,
        })
    }

    fn from_file(name: &str, file: &LinearFile, emb_dim: usize) -> Result<Self> {
        let weight = matrix_from_rows(&format!("{}.weight", name), &file.weight, 1, 2 * emb_dim)?;
        let bias = vector(&format!("{}.bias", name), &file.bias, 1)?;
        Self::new(
            weight.slice(s![0, ..emb_dim]).to_owned(),
            weight.slice(s![0, emb_dim..]).to_owned(),
            bias[0],
        )
    }

    pub fn dim(&self) -> usize {
        self.self_weight.len()
    }

    /// Per-node gate in `[0, 1]`
    pub fn gate(&self, emb: ArrayView2<f32>, side: ArrayView2<f32>) -> Array1<f32> {
        let mut logits = emb.dot(&self.self_weight);
        logits += &side.dot(&self.neighbor_weight);
        logits.mapv(|z| sigmoid(z + self.bias))
    }
}

/// Batch norm with frozen statistics, folded into a per-feature affine map
#[derive(Debug, Clone)]
pub struct FrozenNorm {
    scale: Array1<f32>,
    shift: Array1<f32>,
}

impl FrozenNorm {
    pub fn new(scale: Array1<f32>, shift: Array1<f32>) -> Result<Self> {
        if scale.len() != shift.len() {
            return Err(ModelError::mismatch("norm shift", scale.len(), shift.len()));
        }
        Ok(Self { scale, shift })
    }

    /// `(x - mean) / sqrt(var + eps) * gamma + beta`
    pub fn from_running_stats(
        gamma: &Array1<f32>,
        beta: &Array1<f32>,
        mean: &Array1<f32>,
        var: &Array1<f32>,
        eps: f32,
    ) -> Result<Self> {
        let scale = gamma / &var.mapv(|v| (v + eps).sqrt());
        let shift = beta - &(mean * &scale);
        Self::new(scale, shift)
    }

    pub fn identity(dim: usize) -> Self {
        Self {
            scale: Array1::ones(dim),
            shift: Array1::zeros(dim),
        }
    }

    fn from_file(name: &str, file: &BatchNormFile, emb_dim: usize) -> Result<Self> {
        if !(file.eps.is_finite() && file.eps >= 0.0) {
            return Err(ModelError::ModelLoad(format!("{}.eps is invalid: {}", name, file.eps)));
        }
        let gamma = vector(&format!("{}.weight", name), &file.weight, emb_dim)?;
        let beta = vector(&format!("{}.bias", name), &file.bias, emb_dim)?;
        let mean = vector(&format!("{}.running_mean", name), &file.running_mean, emb_dim)?;
        let var = vector(&format!("{}.running_var", name), &file.running_var, emb_dim)?;
        if var.iter().any(|&v| v + file.eps <= 0.0) {
            return Err(ModelError::ModelLoad(format!("{}.running_var must be positive", name)));
        }
        Self::from_running_stats(&gamma, &beta, &mean, &var, file.eps)
    }

    pub fn dim(&self) -> usize {
        self.scale.len()
    }

    pub fn apply(&self, x: &mut Array2<f32>) {
        *x *= &self.scale;
        *x += &self.shift;
    }
}

/// Everything one propagation layer needs
#[derive(Debug, Clone)]
pub struct LayerParams {
    /// Transform of the gated neighbor signal
    pub w: Linear,
    /// Transform of the bilinear `emb * side` signal
    pub w_self: Linear,
    pub attn: Attention,
    pub norm: FrozenNorm,
}

impl LayerParams {
    fn validate(&self, layer: usize, emb_dim: usize) -> Result<()> {
        let checks = [
            ("w input", self.w.in_dim()),
            ("w output", self.w.out_dim()),
            ("w_self input", self.w_self.in_dim()),
            ("w_self output", self.w_self.out_dim()),
            ("attention", self.attn.dim()),
            ("norm", self.norm.dim()),
        ];
        for (what, found) in checks {
            if found != emb_dim {
                return Err(ModelError::mismatch(
                    format!("layer {} {}", layer, what),
                    emb_dim,
                    found,
                ));
            }
        }
        Ok(())
    }
}

/// Initial embeddings plus the ordered per-layer bundles
#[derive(Debug, Clone)]
pub struct ModelParams {
    user_embedding: Array2<f32>,
    item_embedding: Array2<f32>,
    layers: Vec<LayerParams>,
}

impl ModelParams {
    pub fn new(
        user_embedding: Array2<f32>,
        item_embedding: Array2<f32>,
        layers: Vec<LayerParams>,
    ) -> Result<Self> {
        let emb_dim = user_embedding.ncols();
        if item_embedding.ncols() != emb_dim {
            return Err(ModelError::mismatch(
                "item embedding width",
                emb_dim,
                item_embedding.ncols(),
            ));
        }
        for (k, layer) in layers.iter().enumerate() {
            layer.validate(k, emb_dim)?;
        }
        Ok(Self {
            user_embedding,
            item_embedding,
            layers,
        })
    }

    /// Read and validate `model.json`
    pub fn load(path: &Path) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        let file: ModelFile = serde_json::from_reader(reader)?;
        let params = Self::from_file(&file)?;
        info!(
            "Loaded model: {} users, {} items, dim {}, {} layers",
            params.num_users(),
            params.num_items(),
            params.emb_dim(),
            params.num_layers()
        );
        Ok(params)
    }

    pub fn from_file(file: &ModelFile) -> Result<Self> {
        if file.layers.len() != file.num_layers {
            return Err(ModelError::ModelLoad(format!(
                "declared {} layers but found {}",
                file.num_layers,
                file.layers.len()
            )));
        }
        let d = file.emb_dim;
        let users = matrix_from_rows("user_embedding", &file.user_embedding, file.num_users, d)?;
        let items = matrix_from_rows("item_embedding", &file.item_embedding, file.num_items, d)?;

        let layers = file
            .layers
            .iter()
            .enumerate()
            .map(|(k, layer)| -> Result<LayerParams> {
                Ok(LayerParams {
                    w: Linear::from_file(&format!("W.{}", k), &layer.w, d, d)?,
                    w_self: Linear::from_file(&format!("W_self.{}", k), &layer.w_self, d, d)?,
                    attn: Attention::from_file(&format!("attn.{}", k), &layer.attn, d)?,
                    norm: FrozenNorm::from_file(&format!("bn.{}", k), &layer.bn, d)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Self::new(users, items, layers)
    }

    pub fn num_users(&self) -> usize {
        self.user_embedding.nrows()
    }

    pub fn num_items(&self) -> usize {
        self.item_embedding.nrows()
    }

    pub fn num_nodes(&self) -> usize {
        self.num_users() + self.num_items()
    }

    pub fn emb_dim(&self) -> usize {
        self.user_embedding.ncols()
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn layers(&self) -> &[LayerParams] {
        &self.layers
    }

    /// Width of the final per-node representation, `emb_dim * (layers + 1)`
    pub fn representation_dim(&self) -> usize {
        self.emb_dim() * (self.num_layers() + 1)
    }

    /// Users then items, one row per node
    pub fn ego_embeddings(&self) -> Result<Array2<f32>> {
        Ok(ndarray::concatenate(
            Axis(0),
            &[self.user_embedding.view(), self.item_embedding.view()],
        )?)
    }
}

fn matrix_from_rows(
    name: &str,
    rows: &[Vec<f32>],
    expected_rows: usize,
    expected_cols: usize,
) -> Result<Array2<f32>> {
    if rows.len() != expected_rows {
        return Err(ModelError::ModelLoad(format!(
            "{}: expected {} rows, found {}",
            name,
            expected_rows,
            rows.len()
        )));
    }
    let mut data = Vec::with_capacity(expected_rows * expected_cols);
    for (i, row) in rows.iter().enumerate() {
        if row.len() != expected_cols {
            return Err(ModelError::ModelLoad(format!(
                "{}: row {} has {} values, expected {}",
                name,
                i,
                row.len(),
                expected_cols
            )));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::ModelLoad(format!("{}: row {} is not finite", name, i)));
        }
        data.extend_from_slice(row);
    }
    Ok(Array2::from_shape_vec((expected_rows, expected_cols), data)?)
}

fn vector(name: &str, values: &[f32], expected_len: usize) -> Result<Array1<f32>> {
    if values.len() != expected_len {
        return Err(ModelError::ModelLoad(format!(
            "{}: expected {} values, found {}",
            name,
            expected_len,
            values.len()
        )));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::ModelLoad(format!("{}: values are not finite", name)));
    }
    Ok(Array1::from(values.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn linear_file(dim: usize, fill: f32) -> LinearFile {
        LinearFile {
            weight: vec![vec![fill; dim]; dim],
            bias: vec![0.0; dim],
        }
    }

    fn model_file() -> ModelFile {
        ModelFile {
            num_users: 2,
            num_items: 3,
            emb_dim: 2,
            num_layers: 1,
            user_embedding: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            item_embedding: vec![vec![0.5, 0.5], vec![1.0, 1.0], vec![-1.0, 0.0]],
            layers: vec![LayerFile {
                w: linear_file(2, 0.1),
                w_self: linear_file(2, 0.2),
                attn: LinearFile {
                    weight: vec![vec![0.1, 0.2, 0.3, 0.4]],
                    bias: vec![0.0],
                },
                bn: BatchNormFile {
                    weight: vec![1.0, 1.0],
                    bias: vec![0.0, 0.0],
                    running_mean: vec![0.0, 0.0],
                    running_var: vec![1.0, 1.0],
                    eps: 1e-5,
                },
            }],
        }
    }

    #[test]
    fn test_from_file_shapes() {
        let params = ModelParams::from_file(&model_file()).unwrap();
        assert_eq!(params.num_users(), 2);
        assert_eq!(params.num_items(), 3);
        assert_eq!(params.num_nodes(), 5);
        assert_eq!(params.representation_dim(), 4);
        assert_eq!(params.ego_embeddings().unwrap().row(2).to_vec(), vec![0.5, 0.5]);
    }

    #[test]
    fn test_layer_count_mismatch_is_load_error() {
        let mut file = model_file();
        file.num_layers = 3;
        assert!(matches!(
            ModelParams::from_file(&file),
            Err(ModelError::ModelLoad(_))
        ));
    }

    #[test]
    fn test_garbled_embedding_row() {
        let mut file = model_file();
        file.item_embedding[1] = vec![1.0];
        assert!(matches!(
            ModelParams::from_file(&file),
            Err(ModelError::ModelLoad(_))
        ));

        let mut file = model_file();
        file.user_embedding[0][0] = f32::NAN;
        assert!(ModelParams::from_file(&file).is_err());
    }

    #[test]
    fn test_attention_weight_shape() {
        let mut file = model_file();
        file.layers[0].attn.weight = vec![vec![0.1, 0.2]];
        assert!(ModelParams::from_file(&file).is_err());
    }

    #[test]
    fn test_linear_forward_torch_layout() {
        // weight is (out, in): out0 = x0 + 2*x1, out1 = 3*x0
        let linear = Linear::new(array![[1.0, 2.0], [3.0, 0.0]], array![0.5, -0.5]).unwrap();
        let out = linear.forward(array![[1.0, 1.0]].view());
        assert_eq!(out, array![[3.5f32, 2.5]]);
    }

    #[test]
    fn test_frozen_norm_matches_batch_norm_eval() {
        let norm = FrozenNorm::from_running_stats(
            &array![2.0, 1.0],
            &array![1.0, 0.0],
            &array![1.0, -1.0],
            &array![4.0, 1.0],
            0.0,
        )
        .unwrap();
        let mut x = array![[3.0, 1.0]];
        norm.apply(&mut x);
        // (3 - 1) / 2 * 2 + 1 = 3, (1 + 1) / 1 * 1 + 0 = 2
        assert_eq!(x, array![[3.0f32, 2.0]]);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ModelParams::load(Path::new("/no/such/model.json")).unwrap_err();
        assert!(matches!(err, ModelError::Io(_)));
    }
}
