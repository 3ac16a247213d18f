//! Crawl, filter, match, join, and link stages.

pub mod crawl;
pub mod filter;
pub mod intro;
pub mod join;
pub mod linker;
pub mod matcher;
pub mod workflow;

pub use crawl::{CrawlReport, Crawler, RecordSource, UciHarvester};
pub use filter::{prepare_for_matching, records_with_arxiv_citations, records_with_citations};
pub use join::join_with_mapping;
pub use linker::{ClaimProperties, ClaimWriter, LinkReport};
pub use matcher::KbMatcher;
pub use workflow::{IdSelection, RunOptions, RunReport};
