pub mod arxiv;
pub mod corpus;
pub mod doi;

pub use arxiv::{ArxivId, arxiv_search_key};
pub use corpus::{CorpusToken, resolve_identifier};
pub use doi::{find_doi_url, validate_doi};
