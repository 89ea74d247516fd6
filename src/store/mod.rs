//! Document store abstraction: keyed JSON documents grouped into named
//! collections, with key-ordered listing and atomic merge-upsert batches.
//!
//! Every write in the sync pipeline is a merge-upsert: fields absent from the
//! incoming document are left untouched on an existing one, so concurrent
//! writers targeting the same deterministic id converge per document.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

pub mod memory;
pub mod pg;

/// Collection holding one record per (merchant, location, object, state).
pub const GLOBAL_INVENTORY: &str = "inventory";
/// Collection of merchant registrations (doc id = merchant id).
pub const MERCHANTS: &str = "merchants";

/// Path of a merchant's private inventory collection.
pub fn merchant_inventory_path(merchant_id: &str) -> String {
    format!("merchants/{merchant_id}/inventory")
}

#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

/// One queued merge-upsert.
#[derive(Debug, Clone)]
pub struct WriteOp {
    pub collection: String,
    pub doc_id: String,
    pub data: Value,
}

/// Key-ordered collection listing. Results are always sorted by document id
/// ascending so `start_after` can resume a scan from the last seen id.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub collection: String,
    pub field_eq: Option<(String, String)>,
    pub start_after: Option<String>,
    pub limit: Option<i64>,
}

impl Query {
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Self::default()
        }
    }

    pub fn field_eq(mut self, field: &str, value: &str) -> Self {
        self.field_eq = Some((field.to_string(), value.to_string()));
        self
    }

    pub fn start_after(mut self, doc_id: &str) -> Self {
        self.start_after = Some(doc_id.to_string());
        self
    }

    pub fn limit(mut self, n: i64) -> Self {
        self.limit = Some(n);
        self
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, doc_id: &str) -> Result<Option<Value>>;

    /// Key-ordered listing per [`Query`].
    async fn list(&self, query: &Query) -> Result<Vec<Document>>;

    /// Atomically merge-upsert a batch of documents. Either every write in the
    /// batch lands or none does.
    async fn commit_batch(&self, writes: &[WriteOp]) -> Result<()>;
}
