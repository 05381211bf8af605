//! In-memory item store for tests and local runs.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::RwLock;

use super::{Document, Filter, ItemStore, Key, Page};
use crate::{Error, Result};

struct Table {
    key_attribute: String,
    items: BTreeMap<String, Document>,
}

/// Tables held in ordered maps, paged like DynamoDB: a page covers
/// `page_size` evaluated items before the filter is applied.
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Table>>,
    page_size: usize,
    failing_deletes: HashSet<String>,
    failing_scans: HashSet<String>,
    failing_updates: HashSet<String>,
    lagging_indexes: HashSet<String>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            page_size: usize::MAX,
            failing_deletes: HashSet::new(),
            failing_scans: HashSet::new(),
            failing_updates: HashSet::new(),
            lagging_indexes: HashSet::new(),
        }
    }

    /// Register a table and its hash key attribute.
    pub fn with_table(mut self, name: &str, key_attribute: &str) -> Self {
        self.tables.get_mut().insert(
            name.to_string(),
            Table {
                key_attribute: key_attribute.to_string(),
                items: BTreeMap::new(),
            },
        );
        self
    }

    /// Limit how many items a single scan page evaluates.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Make deletes of the item with this key value fail.
    pub fn fail_delete_of(mut self, key_value: &str) -> Self {
        self.failing_deletes.insert(key_value.to_string());
        self
    }

    /// Make updates of the item with this key value fail.
    pub fn fail_update_of(mut self, key_value: &str) -> Self {
        self.failing_updates.insert(key_value.to_string());
        self
    }

    /// Make every scan of this table fail.
    pub fn fail_scans_of(mut self, table: &str) -> Self {
        self.failing_scans.insert(table.to_string());
        self
    }

    /// Make queries on this index return nothing, as a GSI that has not
    /// caught up with recent writes would.
    pub fn with_lagging_index(mut self, index: &str) -> Self {
        self.lagging_indexes.insert(index.to_string());
        self
    }

    /// Number of items currently stored in a table.
    pub async fn len(&self, table: &str) -> usize {
        self.tables
            .read()
            .await
            .get(table)
            .map(|t| t.items.len())
            .unwrap_or(0)
    }

    /// Whether a table holds no items.
    pub async fn is_empty(&self, table: &str) -> bool {
        self.len(table).await == 0
    }
}

fn missing_table(table: &str) -> Error {
    Error::Store(format!("Requested resource not found: Table: {} not found", table))
}

fn key_value(item: &Document, attribute: &str) -> Result<String> {
    item.get(attribute)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            Error::Store(format!(
                "One or more parameter values were invalid: Missing the key {} in the item",
                attribute
            ))
        })
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn get_item(&self, table: &str, key: &Key) -> Result<Option<Document>> {
        let tables = self.tables.read().await;
        let table = tables.get(table).ok_or_else(|| missing_table(table))?;
        Ok(table.items.get(&key.value).cloned())
    }

    async fn put_item(&self, table: &str, item: Document) -> Result<()> {
        let mut tables = self.tables.write().await;
        let table = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        let id = key_value(&item, &table.key_attribute)?;
        table.items.insert(id, item);
        Ok(())
    }

    async fn update_item(&self, table: &str, key: &Key, fields: Document) -> Result<()> {
        if self.failing_updates.contains(&key.value) {
            return Err(Error::Store(format!("Injected update failure for {}", key.value)));
        }
        let mut tables = self.tables.write().await;
        let table = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        let item = table.items.entry(key.value.clone()).or_insert_with(|| {
            let mut item = Document::new();
            item.insert(key.attribute.clone(), Value::String(key.value.clone()));
            item
        });
        item.extend(fields);
        Ok(())
    }

    async fn delete_item(&self, table: &str, key: &Key) -> Result<()> {
        if self.failing_deletes.contains(&key.value) {
            return Err(Error::Store(format!("Injected delete failure for {}", key.value)));
        }
        let mut tables = self.tables.write().await;
        let table = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        table.items.remove(&key.value);
        Ok(())
    }

    async fn query_index(
        &self,
        table: &str,
        index: &str,
        attribute: &str,
        value: &str,
    ) -> Result<Page> {
        if self.lagging_indexes.contains(index) {
            return Ok(Page::default());
        }
        let tables = self.tables.read().await;
        let table = tables.get(table).ok_or_else(|| missing_table(table))?;
        let filter = Filter::equals(attribute, value);
        let items = table
            .items
            .values()
            .filter(|item| filter.matches(item))
            .cloned()
            .collect();
        Ok(Page {
            items,
            cursor: None,
        })
    }

    async fn scan(
        &self,
        table: &str,
        filter: Option<&Filter>,
        start: Option<Document>,
    ) -> Result<Page> {
        if self.failing_scans.contains(table) {
            return Err(Error::Store(format!("Injected scan failure for {}", table)));
        }
        let tables = self.tables.read().await;
        let table = tables.get(table).ok_or_else(|| missing_table(table))?;

        let after = match start {
            Some(cursor) => Some(key_value(&cursor, &table.key_attribute)?),
            None => None,
        };

        let mut evaluated = table
            .items
            .iter()
            .filter(|(id, _)| after.as_ref().map_or(true, |after| id.as_str() > after.as_str()))
            .peekable();

        let mut page = Page::default();
        let mut last_key = None;
        for _ in 0..self.page_size {
            let Some((id, item)) = evaluated.next() else {
                break;
            };
            last_key = Some(id.clone());
            if filter.map_or(true, |f| f.matches(item)) {
                page.items.push(item.clone());
            }
        }

        if evaluated.peek().is_some() {
            if let Some(id) = last_key {
                let mut cursor = Document::new();
                cursor.insert(table.key_attribute.clone(), Value::String(id));
                page.cursor = Some(cursor);
            }
        }

        Ok(page)
    }
}
