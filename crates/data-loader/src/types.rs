//! Core domain types for the recommender artifacts.
//!
//! Movies and ratings follow the MovieLens layout; the id mappings and the
//! adjacency triplets are the frozen outputs of training.

use serde::{Deserialize, Serialize};

// =============================================================================
// Type Aliases
// =============================================================================

/// External identifier for a user (as it appears in ratings.dat)
pub type UserId = u32;

/// External identifier for a movie (as it appears in movies.dat)
pub type MovieId = u32;

// =============================================================================
// Movie-related Types
// =============================================================================

/// Represents a movie in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    /// Year extracted from title (e.g., "Toy Story (1995)")
    pub year: Option<u16>,
    pub genres: Vec<Genre>,
}

/// Movie genres from MovieLens
///
/// Labels outside the MovieLens-1M set (e.g. "IMAX" in later releases) are
/// kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Genre {
    Action,
    Adventure,
    Animation,
    Children,
    Comedy,
    Crime,
    Documentary,
    Drama,
    Fantasy,
    FilmNoir,
    Horror,
    Musical,
    Mystery,
    Romance,
    SciFi,
    Thriller,
    War,
    Western,
    Other(String),
}

impl Genre {
    /// Name as written in movies.dat
    pub fn label(&self) -> &str {
        match self {
            Genre::Action => "Action",
            Genre::Adventure => "Adventure",
            Genre::Animation => "Animation",
            Genre::Children => "Children's",
            Genre::Comedy => "Comedy",
            Genre::Crime => "Crime",
            Genre::Documentary => "Documentary",
            Genre::Drama => "Drama",
            Genre::Fantasy => "Fantasy",
            Genre::FilmNoir => "Film-Noir",
            Genre::Horror => "Horror",
            Genre::Musical => "Musical",
            Genre::Mystery => "Mystery",
            Genre::Romance => "Romance",
            Genre::SciFi => "Sci-Fi",
            Genre::Thriller => "Thriller",
            Genre::War => "War",
            Genre::Western => "Western",
            Genre::Other(label) => label,
        }
    }
}

// =============================================================================
// Interaction Types
// =============================================================================

/// A single rating from a user for a movie.
///
/// Only used to rebuild the interaction graph; serving never reads ratings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub movie_id: MovieId,
    /// Rating value from 1.0 to 5.0
    pub rating: f32,
    /// Unix timestamp when rating was made
    pub timestamp: i64,
}

// =============================================================================
// Frozen Training Outputs
// =============================================================================

/// One line of user2idx.dat / item2idx.dat: external id -> dense index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdMapping {
    pub id: u32,
    pub index: usize,
}

/// One nonzero of the normalized adjacency, in the combined user+item node space
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdjacencyEntry {
    pub row: usize,
    pub col: usize,
    pub weight: f32,
}

/// Everything the service reads from the artifact directory except the
/// model parameters, which the `ngcf` crate owns.
#[derive(Debug, Default)]
pub struct ArtifactSet {
    /// Movies in file order
    pub movies: Vec<Movie>,
    pub user_mappings: Vec<IdMapping>,
    pub item_mappings: Vec<IdMapping>,
    pub adjacency: Vec<AdjacencyEntry>,
}

impl ArtifactSet {
    /// Creates a new, empty ArtifactSet
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes in the combined user+item graph
    pub fn num_nodes(&self) -> usize {
        self.user_mappings.len() + self.item_mappings.len()
    }

    /// Get counts for debugging/validation: (movies, users, items, adjacency nonzeros)
    pub fn counts(&self) -> (usize, usize, usize, usize) {
        (
            self.movies.len(),
            self.user_mappings.len(),
            self.item_mappings.len(),
            self.adjacency.len(),
        )
    }
}
