use super::{into_body, Document, DocumentStore, Filter, OrderBy};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use indexmap::IndexMap;
use serde_json::Value;
use uuid::Uuid;

/// In-process document store. Collections keep insertion order.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: DashMap<String, IndexMap<String, Document>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create(&self, collection: &str, record: Value) -> Result<String, StoreError> {
        let body = into_body(record)?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let document = Document {
            id: id.clone(),
            created_at: now,
            updated_at: now,
            data: Value::Object(body),
        };
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), document);
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id).cloned()))
    }

    async fn list(
        &self,
        collection: &str,
        filter: Option<&Filter>,
        order_by: Option<&OrderBy>,
    ) -> Result<Vec<Document>, StoreError> {
        let mut docs: Vec<Document> = match self.collections.get(collection) {
            Some(docs) => docs
                .values()
                .filter(|d| filter.map_or(true, |f| f.matches(&d.data)))
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        if let Some(order) = order_by {
            docs.sort_by(|a, b| order.compare(a, b));
        }
        Ok(docs)
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<(), StoreError> {
        let body = into_body(patch)?;
        let not_found = || StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        };

        let mut docs = self.collections.get_mut(collection).ok_or_else(not_found)?;
        let document = docs.get_mut(id).ok_or_else(not_found)?;
        if let Value::Object(data) = &mut document.data {
            data.extend(body);
        }
        document.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn create_then_get_returns_body_with_server_timestamps() {
        let store = MemoryDocumentStore::new();
        let id = store
            .create("clients", json!({"companyName": "Acme", "createdAt": "forged"}))
            .await
            .unwrap();

        let doc = store.get("clients", &id).await.unwrap().unwrap();
        assert_eq!(doc.id, id);
        assert_eq!(doc.data, json!({"companyName": "Acme"}));
        assert_eq!(doc.created_at, doc.updated_at);
        assert!(store.get("clients", "missing").await.unwrap().is_none());
        assert!(store.get("other", &id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_filters_and_orders() {
        let store = MemoryDocumentStore::new();
        store.create("c", json!({"n": 3, "k": "a"})).await.unwrap();
        store.create("c", json!({"n": 1, "k": "b"})).await.unwrap();
        store.create("c", json!({"n": 2, "k": "a"})).await.unwrap();

        let all = store.list("c", None, None).await.unwrap();
        let ns: Vec<_> = all.iter().map(|d| d.data["n"].as_i64().unwrap()).collect();
        assert_eq!(ns, [3, 1, 2]);

        let filter = Filter::new().eq("k", "a");
        let order = OrderBy::asc("n");
        let some = store.list("c", Some(&filter), Some(&order)).await.unwrap();
        let ns: Vec<_> = some.iter().map(|d| d.data["n"].as_i64().unwrap()).collect();
        assert_eq!(ns, [2, 3]);

        assert!(store.list("empty", None, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_merges_top_level_keys() {
        let store = MemoryDocumentStore::new();
        let id = store
            .create("c", json!({"a": 1, "b": {"x": 1}}))
            .await
            .unwrap();
        store
            .update("c", &id, json!({"b": {"y": 2}, "c": true, "id": "nope"}))
            .await
            .unwrap();

        let doc = store.get("c", &id).await.unwrap().unwrap();
        assert_eq!(doc.data, json!({"a": 1, "b": {"y": 2}, "c": true}));
        assert!(doc.updated_at >= doc.created_at);
    }

    #[tokio::test]
    async fn update_of_missing_document_fails() {
        let store = MemoryDocumentStore::new();
        let err = store.update("c", "nope", json!({})).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        store.create("c", json!({})).await.unwrap();
        let err = store.update("c", "nope", json!({})).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }
}
