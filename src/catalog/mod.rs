#[allow(clippy::module_inception)]
mod catalog;
mod load;
mod song;

pub use catalog::{Catalog, SearchField};
pub use load::{load_catalog, Problem as LoadCatalogProblem};
pub use song::{normalize_title, Song};
