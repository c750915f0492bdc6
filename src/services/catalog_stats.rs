use std::collections::HashMap;

use crate::{
    index::Catalog,
    models::{CatalogStats, GenreCount},
};

/// Movie count and the `top_n` most frequent genres (ties broken by name)
pub fn catalog_stats(catalog: &Catalog, top_n: usize) -> CatalogStats {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for genre in catalog.movies().iter().flat_map(|movie| movie.genres.iter()) {
        *counts.entry(genre.as_str()).or_default() += 1;
    }

    let mut top_genres: Vec<GenreCount> = counts
        .into_iter()
        .map(|(genre, count)| GenreCount {
            genre: genre.to_string(),
            count,
        })
        .collect();
    top_genres.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.genre.cmp(&b.genre)));
    top_genres.truncate(top_n);

    CatalogStats {
        total_movies: catalog.len(),
        top_genres,
    }
}
