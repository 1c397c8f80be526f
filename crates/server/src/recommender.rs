//! # Recommender
//!
//! Holds everything a request needs, built once at startup:
//! 1. Load the artifact directory and `model.json`
//! 2. Build the normalized adjacency
//! 3. Run the graph propagation a single time and cache the tables
//! 4. Answer requests by table lookups and dot products
//!
//! The struct is immutable after construction and is shared across request
//! handlers behind an `Arc`.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, ensure};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument};

use data_loader::{ArtifactSet, MovieId, UserId};
use lookup::{Catalog, CloseMatcher, IndexMap, TitleMatcher};
use ngcf::{EmbeddingStore, MODEL_FILE, ModelError, ModelParams, Propagator, SparseAdjacency};
use ngcf::scorer;

/// Failures a single request can run into
#[derive(Error, Debug)]
pub enum RecommendError {
    #[error("User ID {0} not found")]
    UserNotFound(i64),

    #[error("Movie '{0}' not found")]
    MovieNotFound(String),

    #[error("No index found for the matched movie")]
    MovieNotIndexed,

    #[error("Model has no users to compare against")]
    NoUsers,

    #[error("Model error: {0}")]
    Model(#[from] ModelError),
}

/// One recommended movie
#[derive(Debug, Clone, Serialize)]
pub struct MovieRecommendation {
    pub movie_id: MovieId,
    pub title: String,
    pub year: Option<u16>,
    pub genres: Vec<String>,
    pub score: f32,
}

/// Result of the recommend-by-movie flow
#[derive(Debug, Clone)]
pub struct TitleRecommendations {
    /// Catalog title the query resolved to
    pub input_movie: String,
    /// External id of the user closest to that movie
    pub user_like: UserId,
    pub recommendations: Vec<MovieRecommendation>,
}

pub struct Recommender {
    catalog: Catalog,
    index: IndexMap,
    store: EmbeddingStore,
    matcher: Box<dyn TitleMatcher>,
}

impl std::fmt::Debug for Recommender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recommender")
            .field("catalog", &self.catalog)
            .field("index", &self.index)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl Recommender {
    /// Assemble from already-built parts. The id tables and the embedding
    /// tables must agree on the number of users and items.
    pub fn new(
        catalog: Catalog,
        index: IndexMap,
        store: EmbeddingStore,
        matcher: Box<dyn TitleMatcher>,
    ) -> anyhow::Result<Self> {
        ensure!(
            index.num_users() == store.num_users(),
            "user mapping has {} entries but the model has {} users",
            index.num_users(),
            store.num_users()
        );
        ensure!(
            index.num_items() == store.num_items(),
            "item mapping has {} entries but the model has {} items",
            index.num_items(),
            store.num_items()
        );
        Ok(Self {
            catalog,
            index,
            store,
            matcher,
        })
    }

    /// Load an artifact directory and run propagation once
    ///
    /// Any missing or inconsistent artifact is an error; nothing is served
    /// from a partially loaded state.
    pub fn load(artifact_dir: &Path, match_cutoff: f64) -> anyhow::Result<Self> {
        let start = Instant::now();

        let artifacts = ArtifactSet::load_from_files(artifact_dir)
            .with_context(|| format!("Failed to load artifacts from {:?}", artifact_dir))?;
        let params = ModelParams::load(&artifact_dir.join(MODEL_FILE))
            .with_context(|| format!("Failed to load {} from {:?}", MODEL_FILE, artifact_dir))?;

        ensure!(
            params.num_users() == artifacts.user_mappings.len(),
            "model.json declares {} users but user2idx.dat has {}",
            params.num_users(),
            artifacts.user_mappings.len()
        );
        ensure!(
            params.num_items() == artifacts.item_mappings.len(),
            "model.json declares {} items but item2idx.dat has {}",
            params.num_items(),
            artifacts.item_mappings.len()
        );

        let index = IndexMap::from_mappings(&artifacts.user_mappings, &artifacts.item_mappings)
            .context("Invalid id mappings")?;

        let adjacency = SparseAdjacency::from_entries(params.num_nodes(), &artifacts.adjacency)
            .context("Failed to build adjacency")?;
        let store = Propagator::new(params)
            .run(&adjacency)
            .context("Graph propagation failed")?;

        let catalog = Catalog::from_movies(artifacts.movies);
        let matcher = CloseMatcher::new(match_cutoff).context("Invalid match cutoff")?;

        let recommender = Self::new(catalog, index, store, Box::new(matcher))?;
        info!(
            "Recommender ready in {:.2?}: {} titles, {} users, {} items",
            start.elapsed(),
            recommender.catalog.len(),
            recommender.index.num_users(),
            recommender.index.num_items()
        );
        Ok(recommender)
    }

    /// Catalog titles in file order
    pub fn movie_titles(&self) -> &[String] {
        self.catalog.titles()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// External user ids in index order
    pub fn user_ids(&self) -> &[UserId] {
        self.index.user_ids()
    }

    /// Top `limit` movies for an external user id
    #[instrument(skip(self))]
    pub fn recommend_for_user(
        &self,
        user_id: i64,
        limit: usize,
    ) -> Result<Vec<MovieRecommendation>, RecommendError> {
        let user_idx = u32::try_from(user_id)
            .ok()
            .and_then(|id| self.index.user_index(id))
            .ok_or(RecommendError::UserNotFound(user_id))?;
        self.recommend_for_index(user_idx, limit)
    }

    /// Resolve a free-text title, find the user closest to that movie, and
    /// recommend for that user
    #[instrument(skip(self))]
    pub fn recommend_for_title(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<TitleRecommendations, RecommendError> {
        let title = self
            .matcher
            .best_match(query, self.catalog.titles())
            .ok_or_else(|| RecommendError::MovieNotFound(query.to_string()))?;
        debug!("{} resolved {:?} to {:?}", self.matcher.name(), query, title);

        let item_idx = self
            .catalog
            .movie_id_for_title(title)
            .and_then(|movie_id| self.index.item_index(movie_id))
            .ok_or(RecommendError::MovieNotIndexed)?;
        let item = self
            .store
            .item_vector(item_idx)
            .ok_or(RecommendError::MovieNotIndexed)?;

        let nearest = scorer::score_item_against_users(item, self.store.users(), 1)?;
        let user_idx = *nearest.first().ok_or(RecommendError::NoUsers)?;
        let user_like = self.index.user_id(user_idx).ok_or(RecommendError::NoUsers)?;

        Ok(TitleRecommendations {
            input_movie: title.to_string(),
            user_like,
            recommendations: self.recommend_for_index(user_idx, limit)?,
        })
    }

    fn recommend_for_index(
        &self,
        user_idx: usize,
        limit: usize,
    ) -> Result<Vec<MovieRecommendation>, RecommendError> {
        let user = self.store.user_vector(user_idx).ok_or_else(|| {
            RecommendError::Model(ModelError::ModelLoad(format!(
                "no representation for user index {}",
                user_idx
            )))
        })?;
        let scores = scorer::scores(user, self.store.items())?;

        let recommendations: Vec<MovieRecommendation> = scorer::top_k_scored(&scores, limit)
            .into_iter()
            .filter_map(|(item_idx, score)| {
                let movie = self.catalog.movie(self.index.movie_id(item_idx)?)?;
                Some(MovieRecommendation {
                    movie_id: movie.id,
                    title: movie.title.clone(),
                    year: movie.year,
                    genres: movie.genres.iter().map(|g| g.label().to_string()).collect(),
                    score,
                })
            })
            .collect();

        debug!("Selected {} recommendations for user index {}", recommendations.len(), user_idx);
        Ok(recommendations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::{Genre, IdMapping, Movie};
    use ndarray::array;

    // ============================================================================
    // Test Fixtures
    // ============================================================================

    fn movie(id: MovieId, title: &str, genres: Vec<Genre>) -> Movie {
        Movie {
            id,
            title: title.to_string(),
            year: Some(1995),
            genres,
        }
    }

    /// Three users, four indexed items plus one catalog-only movie
    fn build_test_recommender() -> Recommender {
        let catalog = Catalog::from_movies(vec![
            movie(1, "Toy Story (1995)", vec![Genre::Animation, Genre::Children]),
            movie(2, "Jumanji (1995)", vec![Genre::Adventure]),
            movie(3, "Heat (1995)", vec![Genre::Action, Genre::Crime]),
            movie(4, "Casino (1995)", vec![Genre::Drama]),
            movie(5, "Sudden Death (1995)", vec![Genre::Action]),
        ]);
        let index = IndexMap::from_mappings(
            &[
                IdMapping { id: 100, index: 0 },
                IdMapping { id: 200, index: 1 },
                IdMapping { id: 300, index: 2 },
            ],
            &[
                IdMapping { id: 1, index: 0 },
                IdMapping { id: 2, index: 1 },
                IdMapping { id: 3, index: 2 },
                IdMapping { id: 4, index: 3 },
            ],
        )
        .unwrap();
        let store = EmbeddingStore::new(
            array![[1.0, 0.0], [0.0, 1.0], [0.6, 0.6]],
            array![[0.9, 0.1], [0.1, 0.8], [0.4, 0.5], [0.3, 0.2]],
        )
        .unwrap();

        Recommender::new(catalog, index, store, Box::new(CloseMatcher::default())).unwrap()
    }

    fn titles(recs: &[MovieRecommendation]) -> Vec<&str> {
        recs.iter().map(|r| r.title.as_str()).collect()
    }

    // ============================================================================
    // recommend_for_user
    // ============================================================================

    #[test]
    fn test_recommend_for_user_sorted_by_score() {
        let recommender = build_test_recommender();
        let recs = recommender.recommend_for_user(100, 3).unwrap();

        assert_eq!(titles(&recs), vec!["Toy Story (1995)", "Heat (1995)", "Casino (1995)"]);
        assert!(recs.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(recs[0].genres, vec!["Animation", "Children's"]);
    }

    #[test]
    fn test_recommend_for_user_limit_exceeds_items() {
        let recommender = build_test_recommender();
        let recs = recommender.recommend_for_user(200, 10).unwrap();
        assert_eq!(recs.len(), 4);
        assert_eq!(recs[0].title, "Jumanji (1995)");
    }

    #[test]
    fn test_recommend_for_unknown_user() {
        let recommender = build_test_recommender();
        for id in [999, -1, i64::MAX] {
            assert!(matches!(
                recommender.recommend_for_user(id, 10),
                Err(RecommendError::UserNotFound(found)) if found == id
            ));
        }
    }

    // ============================================================================
    // recommend_for_title
    // ============================================================================

    #[test]
    fn test_recommend_for_title_uses_nearest_user() {
        let recommender = build_test_recommender();

        let result = recommender.recommend_for_title("Jumanji (1995)", 2).unwrap();
        assert_eq!(result.input_movie, "Jumanji (1995)");
        assert_eq!(result.user_like, 200);
        assert_eq!(titles(&result.recommendations), vec!["Jumanji (1995)", "Heat (1995)"]);

        let result = recommender.recommend_for_title("Toy Stroy", 10).unwrap();
        assert_eq!(result.input_movie, "Toy Story (1995)");
        assert_eq!(result.user_like, 100);
    }

    #[test]
    fn test_recommend_for_title_errors() {
        let recommender = build_test_recommender();

        let err = recommender.recommend_for_title("Completely Different", 10).unwrap_err();
        assert_eq!(err.to_string(), "Movie 'Completely Different' not found");

        let err = recommender.recommend_for_title("Sudden Death", 10).unwrap_err();
        assert!(matches!(err, RecommendError::MovieNotIndexed));
    }

    #[test]
    fn test_new_rejects_mismatched_tables() {
        let store = EmbeddingStore::new(array![[1.0, 0.0]], array![[1.0, 0.0]]).unwrap();
        let result = Recommender::new(
            Catalog::default(),
            IndexMap::default(),
            store,
            Box::new(CloseMatcher::default()),
        );
        assert!(result.is_err());
    }
}
