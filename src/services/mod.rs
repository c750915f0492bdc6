pub mod catalog_stats;
pub mod providers;
pub mod recommendations;
pub mod title_search;

pub use recommendations::{EnrichmentOptions, RecommendationService};
