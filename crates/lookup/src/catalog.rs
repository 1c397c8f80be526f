//! Movie catalog: titles in file order plus id/title lookups.

use data_loader::{Movie, MovieId};
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    /// Distinct titles, first occurrence order
    titles: Vec<String>,
    title_to_id: HashMap<String, MovieId>,
    movies: HashMap<MovieId, Movie>,
}

impl Catalog {
    /// Build from movies in file order.
    ///
    /// A title listed twice keeps its first position; the later id wins the
    /// title lookup.
    pub fn from_movies(movies: Vec<Movie>) -> Self {
        let mut catalog = Self::default();
        for movie in movies {
            if catalog
                .title_to_id
                .insert(movie.title.clone(), movie.id)
                .is_none()
            {
                catalog.titles.push(movie.title.clone());
            } else {
                debug!("Duplicate title {:?}, now mapped to id {}", movie.title, movie.id);
            }
            catalog.movies.insert(movie.id, movie);
        }
        catalog
    }

    pub fn titles(&self) -> &[String] {
        &self.titles
    }

    pub fn len(&self) -> usize {
        self.titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }

    pub fn movie_id_for_title(&self, title: &str) -> Option<MovieId> {
        self.title_to_id.get(title).copied()
    }

    pub fn movie(&self, id: MovieId) -> Option<&Movie> {
        self.movies.get(&id)
    }

    pub fn title(&self, id: MovieId) -> Option<&str> {
        self.movies.get(&id).map(|m| m.title.as_str())
    }

    /// Case-insensitive substring search. Exact (case-insensitive) title
    /// matches come first, the rest keep catalog order.
    pub fn search(&self, text: &str) -> Vec<&Movie> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }

        let (mut exact, partial): (Vec<&Movie>, Vec<&Movie>) = self
            .titles
            .iter()
            .filter_map(|t| self.movie_id_for_title(t).and_then(|id| self.movie(id)))
            .filter(|m| m.title.to_lowercase().contains(&needle))
            .partition(|m| m.title.to_lowercase() == needle);
        exact.extend(partial);
        exact
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::Genre;

    fn movie(id: MovieId, title: &str) -> Movie {
        Movie {
            id,
            title: title.to_string(),
            year: None,
            genres: vec![Genre::Drama],
        }
    }

    #[test]
    fn test_titles_keep_file_order() {
        let catalog = Catalog::from_movies(vec![
            movie(3, "Casino (1995)"),
            movie(1, "Toy Story (1995)"),
            movie(2, "Heat (1995)"),
        ]);
        assert_eq!(catalog.titles(), ["Casino (1995)", "Toy Story (1995)", "Heat (1995)"]);
        assert_eq!(catalog.movie_id_for_title("Heat (1995)"), Some(2));
        assert_eq!(catalog.title(1), Some("Toy Story (1995)"));
        assert_eq!(catalog.movie_id_for_title("Heat"), None);
    }

    #[test]
    fn test_duplicate_title_last_id_wins() {
        let catalog = Catalog::from_movies(vec![
            movie(10, "Hamlet (1996)"),
            movie(11, "Emma (1996)"),
            movie(12, "Hamlet (1996)"),
        ]);
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.titles()[0], "Hamlet (1996)");
        assert_eq!(catalog.movie_id_for_title("Hamlet (1996)"), Some(12));
        // both ids still resolve to a movie
        assert!(catalog.movie(10).is_some());
    }

    #[test]
    fn test_search_exact_first() {
        let catalog = Catalog::from_movies(vec![
            movie(1, "Heat Wave (1990)"),
            movie(2, "Heat"),
            movie(3, "Toy Story (1995)"),
        ]);
        let hits: Vec<MovieId> = catalog.search("HEAT").iter().map(|m| m.id).collect();
        assert_eq!(hits, vec![2, 1]);
        assert!(catalog.search("   ").is_empty());
    }
}
