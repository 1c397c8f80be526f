//! Two-way tables between external ids and dense model indices.

use crate::error::{LookupError, Result};
use data_loader::{IdMapping, MovieId, UserId};
use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct IndexMap {
    user_to_idx: HashMap<UserId, usize>,
    idx_to_user: Vec<UserId>,
    movie_to_idx: HashMap<MovieId, usize>,
    idx_to_movie: Vec<MovieId>,
}

impl IndexMap {
    /// Both mappings must be bijections onto `0..len`
    pub fn from_mappings(users: &[IdMapping], items: &[IdMapping]) -> Result<Self> {
        let (user_to_idx, idx_to_user) = invert("user", users)?;
        let (movie_to_idx, idx_to_movie) = invert("movie", items)?;
        Ok(Self {
            user_to_idx,
            idx_to_user,
            movie_to_idx,
            idx_to_movie,
        })
    }

    pub fn user_index(&self, user_id: UserId) -> Option<usize> {
        self.user_to_idx.get(&user_id).copied()
    }

    pub fn user_id(&self, idx: usize) -> Option<UserId> {
        self.idx_to_user.get(idx).copied()
    }

    pub fn item_index(&self, movie_id: MovieId) -> Option<usize> {
        self.movie_to_idx.get(&movie_id).copied()
    }

    pub fn movie_id(&self, idx: usize) -> Option<MovieId> {
        self.idx_to_movie.get(idx).copied()
    }

    /// External user ids ordered by index
    pub fn user_ids(&self) -> &[UserId] {
        &self.idx_to_user
    }

    pub fn num_users(&self) -> usize {
        self.idx_to_user.len()
    }

    pub fn num_items(&self) -> usize {
        self.idx_to_movie.len()
    }
}

fn invert(kind: &'static str, mappings: &[IdMapping]) -> Result<(HashMap<u32, usize>, Vec<u32>)> {
    let len = mappings.len();
    let mut forward = HashMap::with_capacity(len);
    let mut backward: Vec<Option<u32>> = vec![None; len];

    for m in mappings {
        if m.index >= len {
            return Err(LookupError::IndexOutOfRange {
                kind,
                index: m.index,
                len,
            });
        }
        if forward.insert(m.id, m.index).is_some() {
            return Err(LookupError::DuplicateId { kind, id: m.id });
        }
        if backward[m.index].replace(m.id).is_some() {
            return Err(LookupError::DuplicateIndex {
                kind,
                index: m.index,
            });
        }
    }

    // len distinct in-range indices fill every slot
    let backward = backward.into_iter().flatten().collect();
    Ok((forward, backward))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping(id: u32, index: usize) -> IdMapping {
        IdMapping { id, index }
    }

    #[test]
    fn test_both_directions() {
        let map = IndexMap::from_mappings(
            &[mapping(42, 1), mapping(7, 0)],
            &[mapping(1, 0), mapping(3, 2), mapping(2, 1)],
        )
        .unwrap();

        assert_eq!(map.user_index(42), Some(1));
        assert_eq!(map.user_id(0), Some(7));
        assert_eq!(map.user_ids(), [7, 42]);
        assert_eq!(map.item_index(3), Some(2));
        assert_eq!(map.movie_id(1), Some(2));
        assert_eq!(map.movie_id(3), None);
        assert_eq!(map.user_index(999), None);
        assert_eq!((map.num_users(), map.num_items()), (2, 3));
    }

    #[test]
    fn test_rejects_non_bijective_mappings() {
        assert!(matches!(
            IndexMap::from_mappings(&[mapping(1, 0), mapping(1, 1)], &[]),
            Err(LookupError::DuplicateId { id: 1, .. })
        ));
        assert!(matches!(
            IndexMap::from_mappings(&[], &[mapping(1, 0), mapping(2, 0)]),
            Err(LookupError::DuplicateIndex { index: 0, .. })
        ));
        assert!(matches!(
            IndexMap::from_mappings(&[mapping(1, 5)], &[]),
            Err(LookupError::IndexOutOfRange { index: 5, len: 1, .. })
        ));
        // a gap leaves some index past the end
        assert!(matches!(
            IndexMap::from_mappings(&[], &[mapping(1, 0), mapping(2, 2)]),
            Err(LookupError::IndexOutOfRange { index: 2, len: 2, .. })
        ));
    }
}
