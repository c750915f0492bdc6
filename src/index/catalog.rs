use std::collections::{HashMap, HashSet};

use crate::{
    error::{AppError, AppResult},
    models::Movie,
};

/// Ordered, index-addressable list of movies
///
/// Position in the catalog is the row/column position in the similarity
/// matrix, so the order is fixed once built.
#[derive(Debug)]
pub struct Catalog {
    movies: Vec<Movie>,
    /// Title → first catalog position carrying that title
    by_title: HashMap<String, usize>,
    duplicate_titles: usize,
}

impl Catalog {
    /// Builds the catalog, rejecting duplicate ids
    pub fn new(movies: Vec<Movie>) -> AppResult<Self> {
        let mut seen_ids = HashSet::with_capacity(movies.len());
        let mut by_title = HashMap::with_capacity(movies.len());
        let mut duplicate_titles = 0;

        for (position, movie) in movies.iter().enumerate() {
            if !seen_ids.insert(&movie.id) {
                return Err(AppError::DataIntegrity(format!(
                    "duplicate movie id {} at position {}",
                    movie.id, position
                )));
            }

            // First occurrence wins; later duplicates stay reachable only by index
            if by_title.contains_key(&movie.title) {
                duplicate_titles += 1;
            } else {
                by_title.insert(movie.title.clone(), position);
            }
        }

        Ok(Self {
            movies,
            by_title,
            duplicate_titles,
        })
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Movie> {
        self.movies.get(index)
    }

    pub fn movies(&self) -> &[Movie] {
        &self.movies
    }

    /// Resolves an exact title to the first matching catalog position
    pub fn resolve(&self, title: &str) -> Option<usize> {
        self.by_title.get(title).copied()
    }

    /// Number of entries whose title was already taken by an earlier entry
    pub fn duplicate_titles(&self) -> usize {
        self.duplicate_titles
    }
}
