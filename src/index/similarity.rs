use std::cmp::Ordering;

use serde::Serialize;

use super::Catalog;
use crate::{
    error::{AppError, AppResult},
    models::Movie,
};

/// A candidate returned by a top-K query
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Neighbor {
    pub index: usize,
    pub score: f32,
}

/// Catalog plus its dense item-to-item similarity matrix
///
/// Read-only after construction and safe to share across requests.
#[derive(Debug)]
pub struct SimilarityIndex {
    catalog: Catalog,
    /// Row-major N×N scores
    scores: Vec<f32>,
}

impl SimilarityIndex {
    /// Pairs a catalog with its matrix, checking that the matrix is N×N
    pub fn new(catalog: Catalog, matrix: Vec<Vec<f32>>) -> AppResult<Self> {
        let n = catalog.len();

        if matrix.len() != n {
            return Err(AppError::DataIntegrity(format!(
                "catalog has {} movies but similarity matrix has {} rows",
                n,
                matrix.len()
            )));
        }

        let mut scores = Vec::with_capacity(n * n);
        for (row_index, row) in matrix.into_iter().enumerate() {
            if row.len() != n {
                return Err(AppError::DataIntegrity(format!(
                    "similarity row {} has {} columns, expected {}",
                    row_index,
                    row.len(),
                    n
                )));
            }
            scores.extend(row);
        }

        Ok(Self { catalog, scores })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    pub fn movie(&self, index: usize) -> Option<&Movie> {
        self.catalog.get(index)
    }

    fn row(&self, index: usize) -> &[f32] {
        let n = self.len();
        &self.scores[index * n..(index + 1) * n]
    }

    /// Returns the `k` highest-scoring neighbors of `query`, never `query` itself
    ///
    /// Ordered by descending score; equal scores are ordered by ascending
    /// catalog index. Returns fewer than `k` entries only when the catalog
    /// has fewer than `k + 1` movies.
    ///
    /// # Panics
    ///
    /// Panics if `query` is not a valid catalog position.
    pub fn top_k(&self, query: usize, k: usize) -> Vec<Neighbor> {
        assert!(
            query < self.len(),
            "query index {} out of bounds for catalog of {} movies",
            query,
            self.len()
        );

        let mut candidates: Vec<Neighbor> = self
            .row(query)
            .iter()
            .enumerate()
            .filter(|(index, _)| *index != query)
            .map(|(index, &score)| Neighbor { index, score })
            .collect();

        let k = k.min(candidates.len());
        if k == 0 {
            return Vec::new();
        }

        if k < candidates.len() {
            candidates.select_nth_unstable_by(k - 1, rank);
            candidates.truncate(k);
        }
        candidates.sort_by(rank);

        candidates
    }
}

/// Descending score, then ascending index
fn rank(a: &Neighbor, b: &Neighbor) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.index.cmp(&b.index))
}
