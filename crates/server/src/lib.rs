//! Server crate for the NGCF recommender.
//!
//! This crate contains the recommender that owns the frozen model state and
//! the HTTP API that exposes it.

pub mod api;
pub mod config;
pub mod error;
pub mod recommender;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use recommender::{MovieRecommendation, RecommendError, Recommender, TitleRecommendations};
