pub mod semantic_scholar;
pub mod uci;

pub use semantic_scholar::{Enrichment, S2Paper, SemanticScholarSource};
pub use uci::{CatalogEntry, FetchedPage, UciSource};
