//! Parser for the `::`-separated artifact files.
//!
//! - movies.dat: movieId::title::genres
//! - ratings.dat: userId::movieId::rating::timestamp
//! - user2idx.dat / item2idx.dat: id::index
//! - graph_adj.dat: row::col::weight
//!
//! All files are read as ISO-8859-1, which is what MovieLens ships.

use crate::error::{DataLoadError, Result};
use crate::types::*;
use std::fmt::Display;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Helper function to read a file with ISO-8859-1 encoding (Latin-1)
///
/// ISO-8859-1 is a single-byte encoding where each byte maps directly to a
/// Unicode code point, so the conversion can't fail.
fn read_lines_latin1(path: &Path) -> Result<Vec<String>> {
    let mut file = File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DataLoadError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => DataLoadError::IoError(e),
    })?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;

    let content: String = bytes.iter().map(|&b| b as char).collect();

    Ok(content.lines().map(|s| s.to_string()).collect())
}

/// File name used in error messages
fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Split a line on "::" and check the field count
fn split_fields<'a>(
    line: &'a str,
    file: &str,
    line_no: usize,
    expected: usize,
) -> Result<Vec<&'a str>> {
    let parts: Vec<&str> = line.split("::").collect();
    if parts.len() != expected {
        return Err(DataLoadError::FieldCountMismatch {
            file: file.to_string(),
            expected,
            found: parts.len(),
            line: line_no,
        });
    }
    Ok(parts)
}

fn parse_field<T>(raw: &str, file: &str, line_no: usize, name: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim().parse().map_err(|e| DataLoadError::ParseError {
        file: file.to_string(),
        line: line_no,
        reason: format!("Invalid {}: {}", name, e),
    })
}

/// Run `parse_line` over every non-empty line of a file
fn parse_lines<T>(
    path: &Path,
    expected_fields: usize,
    mut parse_line: impl FnMut(&[&str], &str, usize) -> Result<T>,
) -> Result<Vec<T>> {
    let file = file_label(path);
    let lines = read_lines_latin1(path)?;
    let mut records = Vec::with_capacity(lines.len());

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        let line_trimmed = line.trim();
        if line_trimmed.is_empty() {
            continue;
        }
        let parts = split_fields(line_trimmed, &file, line_no, expected_fields)?;
        records.push(parse_line(&parts, &file, line_no)?);
    }

    Ok(records)
}

/// Parse the movies.dat file
///
/// Format: movieId::title::genres
///
/// The title often includes year in parentheses: "Toy Story (1995)"
/// Genres are pipe-separated: "Animation|Children's|Comedy"
pub fn parse_movies(path: &Path) -> Result<Vec<Movie>> {
    parse_lines(path, 3, |parts, file, line_no| {
        let title = parts[1];
        Ok(Movie {
            id: parse_field(parts[0], file, line_no, "movieId")?,
            title: title.to_string(),
            year: extract_year_from_title(title),
            genres: parse_genres(parts[2]),
        })
    })
}

/// Parse the ratings.dat file
///
/// Format: userId::movieId::rating::timestamp
pub fn parse_ratings(path: &Path) -> Result<Vec<Rating>> {
    parse_lines(path, 4, |parts, file, line_no| {
        Ok(Rating {
            user_id: parse_field(parts[0], file, line_no, "userId")?,
            movie_id: parse_field(parts[1], file, line_no, "movieId")?,
            rating: parse_field(parts[2], file, line_no, "rating")?,
            timestamp: parse_field(parts[3], file, line_no, "timestamp")?,
        })
    })
}

/// Parse user2idx.dat or item2idx.dat
///
/// Format: id::index
pub fn parse_id_mappings(path: &Path) -> Result<Vec<IdMapping>> {
    parse_lines(path, 2, |parts, file, line_no| {
        Ok(IdMapping {
            id: parse_field(parts[0], file, line_no, "id")?,
            index: parse_field(parts[1], file, line_no, "index")?,
        })
    })
}

/// Parse graph_adj.dat
///
/// Format: row::col::weight
pub fn parse_adjacency(path: &Path) -> Result<Vec<AdjacencyEntry>> {
    parse_lines(path, 3, |parts, file, line_no| {
        let weight: f32 = parse_field(parts[2], file, line_no, "weight")?;
        if !weight.is_finite() {
            return Err(DataLoadError::ParseError {
                file: file.to_string(),
                line: line_no,
                reason: format!("Non-finite weight: {}", weight),
            });
        }
        Ok(AdjacencyEntry {
            row: parse_field(parts[0], file, line_no, "row")?,
            col: parse_field(parts[1], file, line_no, "col")?,
            weight,
        })
    })
}

/// Extract year from movie title
///
/// Example: "Toy Story (1995)" -> Some(1995)
///          "Movie Title" -> None
fn extract_year_from_title(title: &str) -> Option<u16> {
    let start = title.rfind('(')?;
    let end = title.rfind(')')?;
    if start < end {
        let year_str = &title[start + 1..end];
        if let Ok(year) = year_str.parse::<u16>() {
            return Some(year);
        }
    }
    None
}

/// Parse a genre string into Genre enum
///
/// Example: "Action" -> Genre::Action
///          "IMAX" -> Genre::Other("IMAX")
fn parse_genre(s: &str) -> Genre {
    match s {
        "Action" => Genre::Action,
        "Adventure" => Genre::Adventure,
        "Animation" => Genre::Animation,
        "Children's" | "Children" => Genre::Children,
        "Comedy" => Genre::Comedy,
        "Crime" => Genre::Crime,
        "Documentary" => Genre::Documentary,
        "Drama" => Genre::Drama,
        "Fantasy" => Genre::Fantasy,
        "Film-Noir" => Genre::FilmNoir,
        "Horror" => Genre::Horror,
        "Musical" => Genre::Musical,
        "Mystery" => Genre::Mystery,
        "Romance" => Genre::Romance,
        "Sci-Fi" => Genre::SciFi,
        "Thriller" => Genre::Thriller,
        "War" => Genre::War,
        "Western" => Genre::Western,
        other => {
            debug!("Keeping unrecognized genre label {:?}", other);
            Genre::Other(other.to_string())
        }
    }
}

/// Parse pipe-separated genres
///
/// Example: "Action|Adventure|Sci-Fi" -> vec![Genre::Action, Genre::Adventure, Genre::SciFi]
fn parse_genres(s: &str) -> Vec<Genre> {
    let s = s.trim();
    if s.is_empty() || s == "(no genres listed)" {
        return Vec::new();
    }
    s.split('|').map(parse_genre).collect()
}
