//! Postgres-backed document store. Documents live in a single `documents`
//! table keyed by (collection, doc_id) with a JSONB payload; merge-upsert is
//! `data || EXCLUDED.data` so unspecified fields survive concurrent writers.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    PgPool, QueryBuilder, Row,
};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

use super::{Document, DocumentStore, Query, WriteOp};

#[derive(Clone)]
pub struct PgStore {
    pub pool: PgPool,
}

impl PgStore {
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let mut connect_options = PgConnectOptions::from_str(database_url)?;
        if database_url.contains("sslmode=require") {
            connect_options = connect_options.ssl_mode(PgSslMode::Require);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .connect_with(connect_options)
            .await?;
        info!("connected to document store");

        Self::ensure_schema(&pool).await?;
        Ok(Self { pool })
    }

    async fn ensure_schema(pool: &PgPool) -> Result<()> {
        sqlx::raw_sql(
            "CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                doc_id TEXT NOT NULL,
                data JSONB NOT NULL DEFAULT '{}'::jsonb,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                PRIMARY KEY (collection, doc_id)
             )",
        )
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn get(&self, collection: &str, doc_id: &str) -> Result<Option<Value>> {
        let data: Option<Value> = sqlx::query_scalar(
            "SELECT data FROM documents WHERE collection = $1 AND doc_id = $2",
        )
        .persistent(false)
        .bind(collection)
        .bind(doc_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(data)
    }

    async fn list(&self, query: &Query) -> Result<Vec<Document>> {
        let mut qb: QueryBuilder<'_, sqlx::Postgres> =
            QueryBuilder::new("SELECT doc_id, data FROM documents WHERE collection = ");
        qb.push_bind(&query.collection);
        if let Some((field, value)) = &query.field_eq {
            qb.push(" AND data->>");
            qb.push_bind(field);
            qb.push(" = ");
            qb.push_bind(value);
        }
        if let Some(after) = &query.start_after {
            qb.push(" AND doc_id > ");
            qb.push_bind(after);
        }
        qb.push(" ORDER BY doc_id");
        if let Some(limit) = query.limit {
            qb.push(" LIMIT ");
            qb.push_bind(limit);
        }

        let rows = qb.build().persistent(false).fetch_all(&self.pool).await?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(Document {
                id: row.try_get("doc_id")?,
                data: row.try_get("data")?,
            });
        }
        Ok(out)
    }

    async fn commit_batch(&self, writes: &[WriteOp]) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }

        // Postgres rejects ON CONFLICT updates that touch the same row twice in
        // one statement, so keep only the last write per (collection, doc_id).
        let mut latest: HashMap<(&str, &str), &WriteOp> = HashMap::new();
        for w in writes {
            latest.insert((w.collection.as_str(), w.doc_id.as_str()), w);
        }
        let uniques: Vec<&WriteOp> = latest.into_values().collect();

        let mut tx = self.pool.begin().await?;
        let mut qb: QueryBuilder<'_, sqlx::Postgres> =
            QueryBuilder::new("INSERT INTO documents (collection, doc_id, data) ");
        qb.push_values(&uniques, |mut b, w| {
            b.push_bind(&w.collection)
                .push_bind(&w.doc_id)
                .push_bind(&w.data);
        });
        qb.push(
            " ON CONFLICT (collection, doc_id)
              DO UPDATE SET data = documents.data || EXCLUDED.data,
                            updated_at = now()",
        );
        qb.build().persistent(false).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }
}
