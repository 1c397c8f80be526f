//! # Data Loader Crate
//!
//! This crate reads the frozen artifacts the recommender is served from.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (Movie, Rating, IdMapping, AdjacencyEntry, ArtifactSet)
//! - **parser**: Parse `::`-separated .dat files into Rust structs
//! - **artifacts**: Load a whole artifact directory and validate it
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::ArtifactSet;
//! use std::path::Path;
//!
//! let artifacts = ArtifactSet::load_from_files(Path::new("artifacts"))?;
//! let (movies, users, items, nonzeros) = artifacts.counts();
//! println!("{} movies, {} users, {} items, {} edges", movies, users, items, nonzeros);
//! ```

// Public modules
pub mod artifacts;
pub mod error;
pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use artifacts::write_adjacency;
pub use error::{DataLoadError, Result};
pub use types::{
    // Type aliases
    MovieId,
    UserId,
    // Core types
    AdjacencyEntry,
    ArtifactSet,
    IdMapping,
    Movie,
    Rating,
    // Enums
    Genre,
};
