use std::sync::Arc;

use crate::recommender::Recommender;

/// Shared application state
///
/// The recommender is read-only after startup, so handlers share it
/// without locking.
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<Recommender>,
    /// Recommendations per response
    pub top_k: usize,
}

impl AppState {
    pub fn new(recommender: Recommender, top_k: usize) -> Self {
        Self {
            recommender: Arc::new(recommender),
            top_k,
        }
    }
}
