//! In-memory document store with the same merge and key-ordering semantics as
//! the Postgres backend. Used by tests and local dry runs; also keeps counters
//! so tests can assert on batch/write activity.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::{Document, DocumentStore, Query, WriteOp};

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    collections: BTreeMap<String, BTreeMap<String, Value>>,
    batches_committed: u64,
    writes_applied: u64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Direct insert for seeding fixtures; replaces (does not merge).
    pub fn insert(&self, collection: &str, doc_id: &str, data: Value) {
        let mut inner = self.inner.lock().expect("memory store poisoned");
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(doc_id.to_string(), data);
    }

    pub fn doc_count(&self, collection: &str) -> usize {
        let inner = self.inner.lock().expect("memory store poisoned");
        inner.collections.get(collection).map_or(0, BTreeMap::len)
    }

    pub fn batches_committed(&self) -> u64 {
        self.inner.lock().expect("memory store poisoned").batches_committed
    }

    pub fn writes_applied(&self) -> u64 {
        self.inner.lock().expect("memory store poisoned").writes_applied
    }
}

fn merge_into(existing: &mut Value, incoming: &Value) {
    match (existing.as_object_mut(), incoming.as_object()) {
        (Some(cur), Some(new)) => {
            for (k, v) in new {
                cur.insert(k.clone(), v.clone());
            }
        }
        _ => *existing = incoming.clone(),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, doc_id: &str) -> Result<Option<Value>> {
        let inner = self.inner.lock().expect("memory store poisoned");
        Ok(inner
            .collections
            .get(collection)
            .and_then(|c| c.get(doc_id))
            .cloned())
    }

    async fn list(&self, query: &Query) -> Result<Vec<Document>> {
        let inner = self.inner.lock().expect("memory store poisoned");
        let Some(collection) = inner.collections.get(&query.collection) else {
            return Ok(Vec::new());
        };

        let mut out = Vec::new();
        for (id, data) in collection {
            if let Some(after) = &query.start_after {
                if id <= after {
                    continue;
                }
            }
            if let Some((field, value)) = &query.field_eq {
                let matches = data
                    .get(field)
                    .and_then(Value::as_str)
                    .map_or(false, |v| v == value);
                if !matches {
                    continue;
                }
            }
            out.push(Document {
                id: id.clone(),
                data: data.clone(),
            });
            if let Some(limit) = query.limit {
                if out.len() as i64 >= limit {
                    break;
                }
            }
        }
        Ok(out)
    }

    async fn commit_batch(&self, writes: &[WriteOp]) -> Result<()> {
        if writes.is_empty() {
            return Ok(());
        }
        let mut inner = self.inner.lock().expect("memory store poisoned");
        for w in writes {
            let slot = inner
                .collections
                .entry(w.collection.clone())
                .or_default()
                .entry(w.doc_id.clone())
                .or_insert(Value::Object(Default::default()));
            merge_into(slot, &w.data);
        }
        inner.batches_committed += 1;
        inner.writes_applied += writes.len() as u64;
        Ok(())
    }
}
