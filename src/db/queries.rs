use super::{into_body, Direction, Document, DocumentStore, Filter, OrderBy, CREATED_AT_FIELD};
use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

/// Row shape of the `documents` table
#[derive(Debug, FromRow)]
struct DocumentRow {
    id: String,
    data: Json<Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Document {
            id: row.id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            data: row.data.0,
        }
    }
}

/// Document store backed by a single PostgreSQL JSONB table
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create(&self, collection: &str, record: Value) -> Result<String, StoreError> {
        let body = into_body(record)?;
        let id = Uuid::new_v4().to_string();

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(collection)
        .bind(&id)
        .bind(Json(Value::Object(body)))
        .execute(&self.pool)
        .await?;

        tracing::debug!("Created document {}/{}", collection, id);
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, data, created_at, updated_at
            FROM documents
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Document::from))
    }

    async fn list(
        &self,
        collection: &str,
        filter: Option<&Filter>,
        order_by: Option<&OrderBy>,
    ) -> Result<Vec<Document>, StoreError> {
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT id, data, created_at, updated_at FROM documents WHERE collection = ",
        );
        query_builder.push_bind(collection.to_string());

        if let Some(filter) = filter {
            for (field, value) in filter.conditions() {
                query_builder.push(" AND data -> ");
                query_builder.push_bind(field.clone());
                query_builder.push(" = ");
                query_builder.push_bind(Json(value.clone()));
            }
        }

        match order_by {
            Some(order) => {
                let direction = match order.direction {
                    Direction::Asc => " ASC",
                    Direction::Desc => " DESC",
                };
                if order.field == CREATED_AT_FIELD {
                    query_builder.push(" ORDER BY created_at");
                    query_builder.push(direction);
                } else {
                    query_builder.push(" ORDER BY data -> ");
                    query_builder.push_bind(order.field.clone());
                    query_builder.push(direction);
                    query_builder.push(", created_at ASC");
                }
            }
            None => {
                query_builder.push(" ORDER BY created_at ASC");
            }
        }

        let start_time = std::time::Instant::now();
        let rows = query_builder
            .build_query_as::<DocumentRow>()
            .fetch_all(&self.pool)
            .await?;
        tracing::debug!(
            "Listed {} documents from {} in {:?}",
            rows.len(),
            collection,
            start_time.elapsed()
        );

        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn update(&self, collection: &str, id: &str, patch: Value) -> Result<(), StoreError> {
        let body = into_body(patch)?;

        let result = sqlx::query(
            r#"
            UPDATE documents
            SET data = data || $3, updated_at = now()
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Json(Value::Object(body)))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        tracing::debug!("Updated document {}/{}", collection, id);
        Ok(())
    }
}
