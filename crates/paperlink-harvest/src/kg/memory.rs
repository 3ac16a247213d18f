use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::error::{HarvestError, Result};
use crate::kg::KnowledgeBase;
use crate::kg::item::{ActionIfExists, Item};

/// In-memory knowledge base for pipeline tests.
#[derive(Default)]
pub struct InMemoryKnowledgeBase {
    arxiv_index: HashMap<String, Vec<String>>,
    items: Mutex<HashMap<String, Item>>,
    failing_arxiv: HashSet<String>,
    failing_writes: HashSet<String>,
    pub search_calls: AtomicUsize,
    pub write_calls: AtomicUsize,
    next_guid: AtomicUsize,
}

impl InMemoryKnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_publication(mut self, arxiv_id: &str, item_id: &str) -> Self {
        self.arxiv_index
            .entry(arxiv_id.to_string())
            .or_default()
            .push(item_id.to_string());
        self.items
            .get_mut()
            .unwrap()
            .entry(item_id.to_string())
            .or_insert_with(|| Item::new(item_id));
        self
    }

    pub fn with_item(self, item_id: &str) -> Self {
        self.items
            .lock()
            .unwrap()
            .insert(item_id.to_string(), Item::new(item_id));
        self
    }

    pub fn failing_search(mut self, arxiv_id: &str) -> Self {
        self.failing_arxiv.insert(arxiv_id.to_string());
        self
    }

    pub fn failing_write(mut self, item_id: &str) -> Self {
        self.failing_writes.insert(item_id.to_string());
        self
    }

    pub fn item(&self, item_id: &str) -> Option<Item> {
        self.items.lock().unwrap().get(item_id).cloned()
    }

    pub fn searches(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.write_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KnowledgeBase for InMemoryKnowledgeBase {
    async fn search_by_arxiv(&self, arxiv_id: &str) -> Result<Vec<String>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_arxiv.contains(arxiv_id) {
            return Err(HarvestError::KnowledgeBase(format!("search failed for {arxiv_id}")));
        }
        Ok(self.arxiv_index.get(arxiv_id).cloned().unwrap_or_default())
    }

    async fn get_item(&self, item_id: &str) -> Result<Item> {
        self.item(item_id)
            .ok_or_else(|| HarvestError::ItemNotFound(item_id.to_string()))
    }

    async fn write_item(&self, item: &Item) -> Result<()> {
        self.write_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_writes.contains(&item.id) {
            return Err(HarvestError::KnowledgeBase(format!("edit rejected for {}", item.id)));
        }

        let mut items = self.items.lock().unwrap();
        let stored = items
            .entry(item.id.clone())
            .or_insert_with(|| Item::new(item.id.clone()));
        for statement in item.pending_statements() {
            let mut statement = statement.clone();
            if statement.id.is_none() {
                let n = self.next_guid.fetch_add(1, Ordering::SeqCst);
                statement.id = Some(format!("{}${n}", item.id));
            }
            stored.add_statement(statement, ActionIfExists::AppendOrReplace);
        }
        stored.clear_pending();
        Ok(())
    }
}
