//! Lookup tables between the outside world and the model.
//!
//! This crate provides:
//! - Catalog of movie titles in file order, with title and id lookups
//! - IndexMap between external user/movie ids and dense model indices
//! - TitleMatcher trait and a difflib-compatible CloseMatcher
//!
//! ## Example Usage
//! ```ignore
//! use lookup::{Catalog, CloseMatcher, IndexMap, TitleMatcher};
//!
//! let catalog = Catalog::from_movies(artifacts.movies);
//! let index = IndexMap::from_mappings(&artifacts.user_mappings, &artifacts.item_mappings)?;
//!
//! let matcher = CloseMatcher::default();
//! if let Some(title) = matcher.best_match("Toy Stroy", catalog.titles()) {
//!     let item = catalog.movie_id_for_title(title).and_then(|id| index.item_index(id));
//! }
//! ```

pub mod catalog;
pub mod error;
pub mod index_map;
pub mod matcher;
pub mod traits;

// Re-export main types
pub use catalog::Catalog;
pub use error::{LookupError, Result};
pub use index_map::IndexMap;
pub use matcher::{CloseMatcher, DEFAULT_CUTOFF, ratio};
pub use traits::TitleMatcher;
