use std::path::Path;

use serde::de::DeserializeOwned;

use super::{Catalog, SimilarityIndex};
use crate::{
    error::{AppError, AppResult},
    models::Movie,
};

/// Loads the catalog and similarity matrix from JSON files and validates them together
///
/// Any unreadable or malformed input is a `DataIntegrity` error; the service
/// must not start without a consistent index.
pub async fn load_index(
    catalog_path: impl AsRef<Path>,
    similarity_path: impl AsRef<Path>,
) -> AppResult<SimilarityIndex> {
    let movies: Vec<Movie> = read_json(catalog_path.as_ref()).await?;
    let matrix: Vec<Vec<f32>> = read_json(similarity_path.as_ref()).await?;

    let catalog = Catalog::new(movies)?;
    let index = SimilarityIndex::new(catalog, matrix)?;

    tracing::info!(
        movies = index.len(),
        duplicate_titles = index.catalog().duplicate_titles(),
        "Loaded similarity index"
    );

    if index.catalog().duplicate_titles() > 0 {
        tracing::warn!(
            duplicate_titles = index.catalog().duplicate_titles(),
            "Catalog contains duplicate titles; lookups resolve to the first occurrence"
        );
    }

    Ok(index)
}

async fn read_json<T: DeserializeOwned>(path: &Path) -> AppResult<T> {
    let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
        AppError::DataIntegrity(format!("Failed to read {}: {}", path.display(), e))
    })?;

    serde_json::from_str(&raw).map_err(|e| {
        AppError::DataIntegrity(format!("Failed to parse {}: {}", path.display(), e))
    })
}
