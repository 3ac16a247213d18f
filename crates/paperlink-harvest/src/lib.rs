//! paperlink harvest: UCI crawling, citation extraction, Semantic Scholar
//! enrichment, and knowledge-base linking.

pub mod citations;
pub mod error;
pub mod http;
pub mod identifiers;
pub mod kg;
pub mod pipeline;
pub mod sources;

pub use error::{HarvestError, Result};
pub use http::RateLimitedClient;
pub use kg::{KnowledgeBase, WikibaseClient};
pub use pipeline::{CrawlReport, LinkReport, RunReport};
