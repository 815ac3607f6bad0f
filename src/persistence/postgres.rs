//! PostgreSQL implementation of the document store.
//!
//! All collections share one `documents` table keyed by
//! `(collection, id)` with the document body in a JSONB column (see
//! `migrations/`). Filters are translated to JSONB predicates.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{Collection, Document, DocumentStore, Filter, StoreError};

/// PostgreSQL-backed [`DocumentStore`] using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects to `database_url` and applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the database is unreachable or a
    /// migration fails.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        tracing::info!("connected to PostgreSQL document store");
        Ok(Self::new(pool))
    }
}

/// Appends the filter's predicates, ordering and limit.
fn push_filter(query: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    push_predicates(query, filter);
    if filter.newest_first {
        query.push(" ORDER BY (body->>'created_at')::timestamptz DESC");
    } else {
        query.push(" ORDER BY seq ASC");
    }
    if let Some(limit) = filter.limit {
        query
            .push(" LIMIT ")
            .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
    }
}

fn push_predicates(query: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    if let Some(id) = filter.id {
        query.push(" AND id = ").push_bind(id);
    }
    if let Some(org) = filter.organization_id {
        query
            .push(" AND body->>'organization_id' = ")
            .push_bind(org.to_string());
    }
    if let Some(slug) = &filter.slug {
        query.push(" AND body->>'slug' = ").push_bind(slug.clone());
    }
    if filter.exclude_deleted {
        query.push(" AND COALESCE((body->>'deleted')::boolean, false) = false");
    }
}

/// Maps unique-index violations (primary key or organization slug) to
/// [`StoreError::Conflict`].
fn write_error(collection: Collection, err: sqlx::Error) -> StoreError {
    match err.as_database_error() {
        Some(db) if db.is_unique_violation() => {
            StoreError::Conflict(format!("{collection} document already exists: {db}"))
        }
        _ => StoreError::Backend(err.to_string()),
    }
}

#[async_trait]
impl DocumentStore for PostgresStore {
    async fn find(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<Document>, StoreError> {
        let mut query = QueryBuilder::<Postgres>::new("SELECT body FROM documents WHERE collection = ");
        query.push_bind(collection.as_str());
        push_filter(&mut query, filter);

        let rows = query
            .build_query_scalar::<Value>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        rows.into_iter()
            .map(|body| match body {
                Value::Object(map) => Ok(map),
                other => Err(StoreError::Codec(format!(
                    "{collection} body is not an object: {other}"
                ))),
            })
            .collect()
    }

    async fn insert(
        &self,
        collection: Collection,
        id: uuid::Uuid,
        mut document: Document,
    ) -> Result<(), StoreError> {
        document.insert("id".to_string(), Value::String(id.to_string()));
        sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
            .bind(collection.as_str())
            .bind(id)
            .bind(Value::Object(document))
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(collection, e))?;
        Ok(())
    }

    async fn update_fields(
        &self,
        collection: Collection,
        filter: &Filter,
        fields: Document,
    ) -> Result<u64, StoreError> {
        let mut query = QueryBuilder::<Postgres>::new("UPDATE documents SET body = body || ");
        query
            .push_bind(Value::Object(fields))
            .push(" WHERE collection = ")
            .push_bind(collection.as_str());
        push_predicates(&mut query, filter);

        let result = query
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| write_error(collection, e))?;
        Ok(result.rows_affected())
    }
}
