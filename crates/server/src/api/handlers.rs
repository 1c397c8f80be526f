use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use std::num::IntErrorKind;
use tracing::{debug, instrument};

use data_loader::UserId;

use crate::error::{ApiError, ApiResult};

use super::AppState;

// Request/Response types

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MovieQuery {
    pub movie_title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MoviesResponse {
    pub movies: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct UserRecommendationsResponse {
    pub user_id: i64,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct MovieRecommendationsResponse {
    pub input_movie: String,
    pub user_like: UserId,
    pub recommendations: Vec<String>,
}

/// Present and non-empty, otherwise a 400 naming the parameter
fn required(value: Option<String>, name: &str) -> ApiResult<String> {
    value
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::InvalidInput(format!("Missing {} parameter", name)))
}

/// Parse a `user_id` as an integer.
///
/// Well-formed integers too large for `i64` can't name a known user, so they
/// are reported as not found rather than malformed.
fn parse_user_id(raw: &str) -> ApiResult<i64> {
    let raw = raw.trim();
    raw.parse().map_err(|e: std::num::ParseIntError| match e.kind() {
        IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
            ApiError::NotFound(format!("User ID {} not found", canonical_integer(raw)))
        }
        _ => ApiError::InvalidInput("Invalid user_id format".to_string()),
    })
}

/// Drop a leading '+' and leading zeros from a digit string
fn canonical_integer(raw: &str) -> String {
    let (sign, digits) = match raw.strip_prefix('-') {
        Some(digits) => ("-", digits),
        None => ("", raw.strip_prefix('+').unwrap_or(raw)),
    };
    format!("{}{}", sign, digits.trim_start_matches('0'))
}

// Handlers

/// Liveness banner
pub async fn index() -> &'static str {
    "Enhanced NGCF Recommender API is running."
}

/// Every catalog title, in file order
pub async fn list_movies(State(state): State<AppState>) -> Json<MoviesResponse> {
    Json(MoviesResponse {
        movies: state.recommender.movie_titles().to_vec(),
    })
}

#[instrument(skip(state))]
pub async fn recommend_by_user(
    State(state): State<AppState>,
    Query(params): Query<UserQuery>,
) -> ApiResult<Json<UserRecommendationsResponse>> {
    let raw = required(params.user_id, "user_id")?;
    let user_id = parse_user_id(&raw)?;

    let recommender = state.recommender.clone();
    let limit = state.top_k;
    let recommendations =
        tokio::task::spawn_blocking(move || recommender.recommend_for_user(user_id, limit))
            .await??;
    debug!("Returning {} recommendations for user {}", recommendations.len(), user_id);

    Ok(Json(UserRecommendationsResponse {
        user_id,
        recommendations: recommendations.into_iter().map(|r| r.title).collect(),
    }))
}

#[instrument(skip(state))]
pub async fn recommend_by_movie(
    State(state): State<AppState>,
    Query(params): Query<MovieQuery>,
) -> ApiResult<Json<MovieRecommendationsResponse>> {
    let title = required(params.movie_title, "movie_title")?;

    let recommender = state.recommender.clone();
    let limit = state.top_k;
    let result =
        tokio::task::spawn_blocking(move || recommender.recommend_for_title(&title, limit))
            .await??;

    Ok(Json(MovieRecommendationsResponse {
        input_movie: result.input_movie,
        user_like: result.user_like,
        recommendations: result.recommendations.into_iter().map(|r| r.title).collect(),
    }))
}
