//! Loading and validating the artifact directory.
//!
//! The four `.dat` artifacts are parsed in parallel and then cross-checked:
//! every adjacency entry must fall inside the combined user+item node range.
//! Whether each id mapping is a bijection is checked when `lookup::IndexMap`
//! is built from it.

use crate::error::{DataLoadError, Result};
use crate::parser;
use crate::types::*;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

pub const MOVIES_FILE: &str = "movies.dat";
pub const USER_INDEX_FILE: &str = "user2idx.dat";
pub const ITEM_INDEX_FILE: &str = "item2idx.dat";
pub const ADJACENCY_FILE: &str = "graph_adj.dat";
pub const RATINGS_FILE: &str = "ratings.dat";

impl ArtifactSet {
    /// Load every `.dat` artifact from a directory
    ///
    /// Steps:
    /// 1. Parse movies, both id mappings and the adjacency (in parallel)
    /// 2. Validate the mappings and the adjacency against each other
    pub fn load_from_files(artifact_dir: &Path) -> Result<Self> {
        info!("Loading artifacts from {:?}", artifact_dir);

        let movies_path = artifact_dir.join(MOVIES_FILE);
        let users_path = artifact_dir.join(USER_INDEX_FILE);
        let items_path = artifact_dir.join(ITEM_INDEX_FILE);
        let adjacency_path = artifact_dir.join(ADJACENCY_FILE);

        // Nested joins give four-way parallelism
        let ((movies, adjacency), (user_mappings, item_mappings)) = rayon::join(
            || {
                rayon::join(
                    || parser::parse_movies(&movies_path),
                    || parser::parse_adjacency(&adjacency_path),
                )
            },
            || {
                rayon::join(
                    || parser::parse_id_mappings(&users_path),
                    || parser::parse_id_mappings(&items_path),
                )
            },
        );

        let set = ArtifactSet {
            movies: movies?,
            user_mappings: user_mappings?,
            item_mappings: item_mappings?,
            adjacency: adjacency?,
        };

        let (movies, users, items, nonzeros) = set.counts();
        info!(
            "Loaded {} movies, {} users, {} items, {} adjacency entries",
            movies, users, items, nonzeros
        );

        set.validate()?;
        Ok(set)
    }

    /// Validate artifact integrity
    ///
    /// Every adjacency entry must lie inside the `num_nodes x num_nodes` square
    pub fn validate(&self) -> Result<()> {
        let num_nodes = self.num_nodes();
        if let Some(entry) = self
            .adjacency
            .iter()
            .find(|e| e.row >= num_nodes || e.col >= num_nodes)
        {
            return Err(DataLoadError::ValidationError(format!(
                "adjacency entry ({}, {}) outside {} nodes",
                entry.row, entry.col, num_nodes
            )));
        }

        debug!("Artifacts validated ({} nodes)", num_nodes);
        Ok(())
    }
}

/// Write adjacency entries in graph_adj.dat format
pub fn write_adjacency(path: &Path, entries: &[AdjacencyEntry]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for entry in entries {
        writeln!(writer, "{}::{}::{}", entry.row, entry.col, entry.weight)?;
    }
    writer.flush()?;
    info!("Wrote {} adjacency entries to {:?}", entries.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn fixture_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join(format!("data-loader-artifacts-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_basic_artifacts(dir: &Path, adjacency: &str) {
        std::fs::write(
            dir.join(MOVIES_FILE),
            "1::Toy Story (1995)::Animation|Children's|Comedy\n2::Heat (1995)::Action|Crime|Thriller\n",
        )
        .unwrap();
        std::fs::write(dir.join(USER_INDEX_FILE), "7::0\n").unwrap();
        std::fs::write(dir.join(ITEM_INDEX_FILE), "1::0\n2::1\n").unwrap();
        std::fs::write(dir.join(ADJACENCY_FILE), adjacency).unwrap();
    }

    #[test]
    fn test_load_artifacts() {
        let dir = fixture_dir("ok");
        write_basic_artifacts(&dir, "0::1::0.7071\n1::0::0.7071\n");

        let set = ArtifactSet::load_from_files(&dir).unwrap();
        assert_eq!(set.counts(), (2, 1, 2, 2));
        assert_eq!(set.num_nodes(), 3);
    }

    #[test]
    fn test_adjacency_out_of_range() {
        let dir = fixture_dir("range");
        write_basic_artifacts(&dir, "0::3::1.0\n");

        let err = ArtifactSet::load_from_files(&dir).unwrap_err();
        assert!(matches!(err, DataLoadError::ValidationError(_)));
    }

    #[test]
    fn test_missing_artifact_is_fatal() {
        let dir = fixture_dir("missing");
        let _ = std::fs::remove_file(dir.join(ADJACENCY_FILE));
        std::fs::write(dir.join(MOVIES_FILE), "1::Heat (1995)::Action\n").unwrap();

        let err = ArtifactSet::load_from_files(&dir).unwrap_err();
        assert!(matches!(err, DataLoadError::FileNotFound { .. }));
    }

    #[test]
    fn test_write_adjacency_round_trip() {
        let dir = fixture_dir("write");
        let path = dir.join(ADJACENCY_FILE);
        let entries = vec![
            AdjacencyEntry { row: 0, col: 2, weight: 0.5 },
            AdjacencyEntry { row: 2, col: 0, weight: 0.5 },
        ];
        write_adjacency(&path, &entries).unwrap();
        assert_eq!(parser::parse_adjacency(&path).unwrap(), entries);
    }
}
