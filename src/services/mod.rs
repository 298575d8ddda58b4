pub mod enrichment;
pub mod providers;
pub mod rating_matrix;
pub mod recommendations;
pub mod similarity;
pub mod title_resolver;

pub use recommendations::{Recommender, RecommenderSettings};
