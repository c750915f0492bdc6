use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Display metadata for a movie, fetched from an external catalog
///
/// Every field is optional: providers may return partial records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metadata {
    pub overview: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub average_rating: Option<f64>,
    pub vote_count: Option<u64>,
    pub popularity: Option<f64>,
    /// Provider-relative poster path (e.g. "/kqjL17yufvn9OVLyXYpvtyrFfak.jpg")
    pub poster_path: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Raw response from GET /search/movie
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbSearchResponse {
    #[serde(default)]
    pub results: Vec<TmdbMovie>,
}

/// A single TMDB search hit
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovie {
    /// Title of the hit, logged to show which movie a query matched
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub vote_count: Option<u64>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub poster_path: Option<String>,
}

/// TMDB sends "" for unknown release dates
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()))
}

impl From<TmdbMovie> for Metadata {
    fn from(movie: TmdbMovie) -> Self {
        Metadata {
            overview: movie.overview.filter(|s| !s.is_empty()),
            release_date: movie.release_date,
            average_rating: movie.vote_average,
            vote_count: movie.vote_count,
            popularity: movie.popularity,
            poster_path: movie.poster_path.filter(|s| !s.is_empty()),
            fetched_at: Utc::now(),
        }
    }
}
