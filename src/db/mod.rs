pub mod memory;
pub mod pool;
pub mod queries;

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

pub use memory::MemoryDocumentStore;
pub use pool::{create_pool, ensure_schema};
pub use queries::PgDocumentStore;

/// Collection names used by the services
pub mod collections {
    pub const CLIENTS: &str = "clients";
    pub const INVOICES: &str = "invoices";
    pub const QUOTATIONS: &str = "quotations";
    pub const DELIVERY_ORDERS: &str = "deliveryOrders";
    pub const SETTINGS: &str = "settings";
}

/// Server-assigned timestamp field, usable in `OrderBy`
pub const CREATED_AT_FIELD: &str = "createdAt";

const RESERVED_FIELDS: [&str; 3] = ["id", "createdAt", "updatedAt"];

/// A stored document: opaque JSON body plus store-owned metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub data: Value,
}

impl Document {
    pub fn created_date(&self) -> NaiveDate {
        self.created_at.date_naive()
    }

    /// Decode the body into a typed record, keeping the metadata alongside.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<Record<T>, StoreError> {
        let data = T::deserialize(&self.data)?;
        Ok(Record {
            id: self.id.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            data,
        })
    }
}

/// Typed view of a document as returned by the services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record<T> {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub data: T,
}

/// Conjunction of top-level field equality tests
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[(String, Value)] {
        &self.conditions
    }

    pub fn matches(&self, data: &Value) -> bool {
        self.conditions
            .iter()
            .all(|(field, expected)| data.get(field) == Some(expected))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }

    pub fn newest_first() -> Self {
        Self::desc(CREATED_AT_FIELD)
    }

    /// Ordering between two documents. Missing fields sort after present
    /// ones in ascending order, matching PostgreSQL's NULL placement.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        let ord = if self.field == CREATED_AT_FIELD {
            a.created_at.cmp(&b.created_at)
        } else {
            match (a.data.get(&self.field), b.data.get(&self.field)) {
                (Some(x), Some(y)) => compare_values(x, y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        };
        match self.direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        }
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::String(_) => 1,
        Value::Number(_) => 2,
        Value::Bool(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or_default();
            let y = y.as_f64().unwrap_or_default();
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Validate a record or patch body and drop store-owned keys from it.
pub(crate) fn into_body(value: Value) -> Result<Map<String, Value>, StoreError> {
    let Value::Object(mut map) = value else {
        return Err(StoreError::InvalidDocument(
            "document body must be a JSON object".to_string(),
        ));
    };
    for key in RESERVED_FIELDS {
        map.remove(key);
    }
    Ok(map)
}

/// The persistence collaborator: four verbs over JSON documents.
///
/// Writes are independent and last-write-wins; no transactions are offered.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a new document and return its generated id.
    async fn create(&self, collection: &str, record: Value) -> Result<String, StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    async fn list(
        &self,
        collection: &str,
        filter: Option<&Filter>,
        order_by: Option<&OrderBy>,
    ) -> Result<Vec<Document>, StoreError>;

    /// Shallow-merge `patch` into an existing document.
    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, data: Value) -> Document {
        let now = Utc::now();
        Document {
            id: id.to_string(),
            created_at: now,
            updated_at: now,
            data,
        }
    }

    #[test]
    fn filter_requires_every_condition() {
        let f = Filter::new().eq("status", "paid").eq("clientId", "c1");
        assert!(f.matches(&json!({"status": "paid", "clientId": "c1", "x": 1})));
        assert!(!f.matches(&json!({"status": "paid", "clientId": "c2"})));
        assert!(!f.matches(&json!({"status": "paid"})));
        assert!(Filter::new().matches(&json!({})));
    }

    #[test]
    fn order_puts_missing_fields_last_when_ascending() {
        let a = doc("a", json!({"name": "Beta"}));
        let b = doc("b", json!({"name": "Alpha"}));
        let c = doc("c", json!({}));
        let mut docs = vec![c.clone(), a.clone(), b.clone()];
        let order = OrderBy::asc("name");
        docs.sort_by(|x, y| order.compare(x, y));
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["b", "a", "c"]);

        let order = OrderBy::desc("name");
        docs.sort_by(|x, y| order.compare(x, y));
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn body_must_be_an_object_and_loses_reserved_keys() {
        assert!(into_body(json!([1, 2])).is_err());
        let body = into_body(json!({"id": "x", "createdAt": "t", "name": "n"})).unwrap();
        assert_eq!(body.len(), 1);
        assert_eq!(body["name"], "n");
    }

    #[test]
    fn decode_keeps_metadata() {
        #[derive(Deserialize)]
        struct Named {
            name: String,
        }
        let d = doc("id-1", json!({"name": "Acme"}));
        let rec = d.decode::<Named>().unwrap();
        assert_eq!(rec.id, "id-1");
        assert_eq!(rec.data.name, "Acme");
        assert_eq!(d.created_date(), d.created_at.date_naive());
    }
}
