//! Knowledge-base access: search by arXiv ID, read items, write statements.

pub mod item;
pub mod wikibase;

#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;

use crate::error::Result;

pub use item::{ActionIfExists, Item, Rank, Reference, Snak, SnakKind, SnakValue, Statement};
pub use wikibase::{Credentials, WikibaseClient};

#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Item IDs of publications carrying `arxiv_id`, in the order the search returns them.
    async fn search_by_arxiv(&self, arxiv_id: &str) -> Result<Vec<String>>;

    async fn get_item(&self, item_id: &str) -> Result<Item>;

    /// Persists the item's pending statements.
    async fn write_item(&self, item: &Item) -> Result<()>;
}
