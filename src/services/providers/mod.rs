//! Metadata providers
//!
//! A provider looks up display metadata (overview, rating, poster...) for a
//! movie title in some external catalog. Lookups are best effort: callers
//! treat every error as "no metadata" for that one movie.
use crate::{error::AppResult, models::Metadata};

pub mod breaker;
pub mod disabled;
pub mod tmdb;

pub use breaker::CircuitBreakerProvider;
pub use disabled::DisabledProvider;
pub use tmdb::TmdbProvider;

/// Source of per-title display metadata
///
/// `Ok(Some(_))` is a match, `Ok(None)` means the catalog has no such title,
/// and `Err(_)` is a transient or configuration failure. Implementations must
/// be safe to call concurrently.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn fetch(&self, title: &str) -> AppResult<Option<Metadata>>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}
