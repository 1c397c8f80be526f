//! # NGCF Crate
//!
//! Inference side of a Neural Graph Collaborative Filtering model with an
//! attention gate. Training happens elsewhere; this crate loads the frozen
//! parameters, propagates them over the normalized user-item graph once,
//! and scores users against items.
//!
//! ## Main Components
//!
//! - **params**: `model.json` layout and validated layer bundles
//! - **adjacency**: CSR form of the normalized bipartite graph
//! - **propagation**: The per-layer forward pass
//! - **store**: Concatenated final representations, split by node kind
//! - **scorer**: Dot-product scores and deterministic top-k
//!
//! ## Example Usage
//!
//! ```ignore
//! use ngcf::{ModelParams, Propagator, SparseAdjacency, scorer};
//!
//! let params = ModelParams::load(Path::new("artifacts/model.json"))?;
//! let adjacency = SparseAdjacency::from_entries(params.num_nodes(), &entries)?;
//! let store = Propagator::new(params).run(&adjacency)?;
//!
//! let user = store.user_vector(0).expect("user 0");
//! let best = scorer::score_user_against_items(user, store.items(), 10)?;
//! ```

pub mod adjacency;
pub mod error;
pub mod params;
pub mod propagation;
pub mod scorer;
pub mod store;

pub use adjacency::SparseAdjacency;
pub use error::{ModelError, Result};
pub use params::{Attention, FrozenNorm, LayerParams, Linear, MODEL_FILE, ModelFile, ModelParams};
pub use propagation::{Propagator, l2_normalize_rows, propagate_layer};
pub use scorer::{score_item_against_users, score_user_against_items, top_k, top_k_scored};
pub use store::EmbeddingStore;
