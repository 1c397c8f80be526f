//! Core trait for title matching.
//!
//! The recommender resolves free-text movie titles through this trait so the
//! similarity function can be swapped without touching request handling.

/// Resolve a user-supplied title against the catalog.
///
/// ## Design Note
/// - `Send + Sync` lets one matcher be shared by every request handler
/// - The returned title borrows from `titles`, never from `query`
pub trait TitleMatcher: Send + Sync {
    /// Returns the name of this matcher (for logging/debugging)
    fn name(&self) -> &str;

    /// The single best catalog title for `query`, or `None` when nothing is
    /// close enough.
    fn best_match<'a>(&self, query: &str, titles: &'a [String]) -> Option<&'a str>;
}
