mod manager;
mod persistence;

pub use manager::{CatalogData, RecipeCatalog};
pub use persistence::{load_catalog, parse_catalog, save_catalog};
