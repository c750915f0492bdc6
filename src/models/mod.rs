pub mod metadata;
pub mod movie;
pub mod recommendation;

pub use metadata::{Metadata, TmdbMovie, TmdbSearchResponse};
pub use movie::{Movie, MovieId};
pub use recommendation::{
    CatalogStats, GenreCount, Recommendation, RecommendationResponse, SelectedMovie,
};
