pub mod catalog;
pub mod loader;
pub mod similarity;

pub use catalog::Catalog;
pub use loader::load_index;
pub use similarity::{Neighbor, SimilarityIndex};
