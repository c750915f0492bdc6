use crate::{index::Catalog, models::Movie};

/// Case-insensitive substring search over catalog titles
///
/// Results keep catalog order. An empty query lists the catalog from the start.
pub fn search_titles<'a>(catalog: &'a Catalog, query: &str, limit: usize) -> Vec<&'a Movie> {
    let needle = query.trim().to_lowercase();

    catalog
        .movies()
        .iter()
        .filter(|movie| needle.is_empty() || movie.title.to_lowercase().contains(&needle))
        .take(limit)
        .collect()
}
