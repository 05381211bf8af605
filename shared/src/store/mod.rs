//! Item store abstraction over the calendar tables.
//!
//! Items travel through the store as JSON documents keyed by their stored
//! attribute names (`EventId`, `Date`, `semesterId`, ...). Operations hold an
//! `Arc<dyn ItemStore>` so tests can swap DynamoDB for [`MemoryStore`].

mod dynamo;
mod memory;

pub use dynamo::DynamoStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::Result;

/// A stored item, attribute name to value.
pub type Document = Map<String, Value>;

/// Primary key of an item: a single string hash key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key {
    pub attribute: String,
    pub value: String,
}

impl Key {
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }
}

/// Predicate evaluated per item during a scan.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Attribute equals the value. Items missing the attribute never match.
    Equals { attribute: String, value: Value },
    /// String attribute lies in `[low, high]`, compared lexically.
    Between {
        attribute: String,
        low: String,
        high: String,
    },
}

impl Filter {
    pub fn equals(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Equals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn between(
        attribute: impl Into<String>,
        low: impl Into<String>,
        high: impl Into<String>,
    ) -> Self {
        Filter::Between {
            attribute: attribute.into(),
            low: low.into(),
            high: high.into(),
        }
    }

    /// Evaluate the predicate client-side.
    pub fn matches(&self, item: &Document) -> bool {
        match self {
            Filter::Equals { attribute, value } => item.get(attribute) == Some(value),
            Filter::Between {
                attribute,
                low,
                high,
            } => match item.get(attribute).and_then(Value::as_str) {
                Some(v) => low.as_str() <= v && v <= high.as_str(),
                None => false,
            },
        }
    }
}

/// One page of query or scan results.
#[derive(Debug, Default)]
pub struct Page {
    pub items: Vec<Document>,
    /// Continuation cursor; `None` once the table is exhausted.
    pub cursor: Option<Document>,
}

/// Key-value document store backing the calendar tables.
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Fetch a single item by primary key.
    async fn get_item(&self, table: &str, key: &Key) -> Result<Option<Document>>;

    /// Write a whole item, replacing any existing one with the same key.
    async fn put_item(&self, table: &str, item: Document) -> Result<()>;

    /// Set the given attributes on an item, leaving the others untouched.
    async fn update_item(&self, table: &str, key: &Key, fields: Document) -> Result<()>;

    /// Delete an item by primary key. Deleting a missing item is not an error.
    async fn delete_item(&self, table: &str, key: &Key) -> Result<()>;

    /// Equality query on a secondary index. Returns the first page only.
    async fn query_index(
        &self,
        table: &str,
        index: &str,
        attribute: &str,
        value: &str,
    ) -> Result<Page>;

    /// Scan a table, optionally filtered, starting after `start`.
    async fn scan(
        &self,
        table: &str,
        filter: Option<&Filter>,
        start: Option<Document>,
    ) -> Result<Page>;
}

/// Scan every page of a table, following continuation cursors.
pub async fn scan_all(
    store: &dyn ItemStore,
    table: &str,
    filter: Option<&Filter>,
) -> Result<Vec<Document>> {
    let mut items = Vec::new();
    let mut start = None;

    loop {
        let page = store.scan(table, filter, start).await?;
        items.extend(page.items);
        match page.cursor {
            Some(cursor) => start = Some(cursor),
            None => return Ok(items),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_equals_requires_attribute() {
        let filter = Filter::equals("isCurrent", false);
        assert!(filter.matches(&doc(json!({"isCurrent": false}))));
        assert!(!filter.matches(&doc(json!({"name": "Fall"}))));
    }

    #[test]
    fn test_between_is_inclusive() {
        let filter = Filter::between("Date", "2024-10-01", "2024-10-31");
        assert!(filter.matches(&doc(json!({"Date": "2024-10-01"}))));
        assert!(filter.matches(&doc(json!({"Date": "2024-10-31"}))));
        assert!(!filter.matches(&doc(json!({"Date": "2024-11-01"}))));
        assert!(!filter.matches(&doc(json!({"Date": 20241015}))));
    }

    #[tokio::test]
    async fn test_scan_all_follows_cursors() {
        let store = MemoryStore::new()
            .with_table("Events", "EventId")
            .with_page_size(2);
        for i in 0..5 {
            store
                .put_item("Events", doc(json!({"EventId": format!("e{i}"), "semesterId": "s1"})))
                .await
                .unwrap();
        }

        let first = store.scan("Events", None, None).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert!(first.cursor.is_some());

        let all = scan_all(&store, "Events", Some(&Filter::equals("semesterId", "s1")))
            .await
            .unwrap();
        assert_eq!(all.len(), 5);
    }
}
