pub mod loader;

pub use loader::{load_catalog, load_interactions, load_links, Datasets};
