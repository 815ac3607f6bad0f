//! In-process document store.
//!
//! Used when `PERSISTENCE_ENABLED=false` and throughout the tests. Keeps
//! documents per collection in insertion order behind a
//! [`tokio::sync::RwLock`].

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{Collection, Document, DocumentStore, Filter, StoreError, created_at};

/// Volatile [`DocumentStore`]; contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<Collection, Vec<Document>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn id_of(document: &Document) -> Option<&str> {
    document.get("id").and_then(Value::as_str)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let mut found: Vec<Document> = collections
            .get(&collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default();

        if filter.newest_first {
            found.sort_by_key(|d| std::cmp::Reverse(created_at(d)));
        }
        if let Some(limit) = filter.limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    async fn insert(
        &self,
        collection: Collection,
        id: uuid::Uuid,
        mut document: Document,
    ) -> Result<(), StoreError> {
        let id = id.to_string();
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();
        if docs.iter().any(|d| id_of(d) == Some(id.as_str())) {
            return Err(StoreError::Conflict(format!(
                "duplicate {collection} document {id}"
            )));
        }
        if collection == Collection::Organizations
            && let Some(slug) = document.get("slug").and_then(Value::as_str)
            && docs
                .iter()
                .any(|d| Filter::new().slug(slug).live().matches(d))
        {
            return Err(StoreError::Conflict(format!(
                "slug {slug} is already taken"
            )));
        }
        document.insert("id".to_string(), Value::String(id));
        docs.push(document);
        Ok(())
    }

    async fn update_fields(
        &self,
        collection: Collection,
        filter: &Filter,
        fields: Document,
    ) -> Result<u64, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(&collection) else {
            return Ok(0);
        };
        let mut matched = 0;
        for document in docs.iter_mut().filter(|d| filter.matches(d)) {
            document.extend(fields.clone());
            matched += 1;
        }
        Ok(matched)
    }
}
