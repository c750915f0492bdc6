use serde::{Deserialize, Serialize};

use super::{Metadata, Movie};

/// One ranked recommendation, optionally enriched
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub movie: Movie,
    pub similarity: f32,
    pub metadata: Option<Metadata>,
    /// Absolute poster URL, present when metadata carries a poster path
    pub poster_url: Option<String>,
}

/// The queried movie, optionally enriched
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SelectedMovie {
    pub movie: Movie,
    pub metadata: Option<Metadata>,
    pub poster_url: Option<String>,
}

/// Response for a recommendation query
#[derive(Debug, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub query: String,
    pub selected: SelectedMovie,
    pub results: Vec<Recommendation>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GenreCount {
    pub genre: String,
    pub count: usize,
}

/// Summary figures about the loaded catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogStats {
    pub total_movies: usize,
    pub top_genres: Vec<GenreCount>,
}
