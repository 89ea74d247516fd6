//! Batched dual-collection committer. Every record is staged twice with the
//! same document id (global collection + per-merchant subcollection) and the
//! batch is committed whenever the configured cap is reached, then once more
//! for the final partial batch.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::store::{merchant_inventory_path, DocumentStore, WriteOp, GLOBAL_INVENTORY};
use crate::sync::record::InventoryRecord;

/// Default per-batch write cap; stays under typical store batch limits.
pub const DEFAULT_BATCH_CAP: usize = 400;

#[derive(Debug, Clone, Copy, Default)]
pub struct CommitStats {
    pub queued: u64,
    pub committed: u64,
    pub skipped: u64,
}

pub struct DualWriteCommitter<'a> {
    store: &'a dyn DocumentStore,
    batch_cap: usize,
    dry_run: bool,
    pending: Vec<WriteOp>,
    stats: CommitStats,
}

impl<'a> DualWriteCommitter<'a> {
    pub fn new(store: &'a dyn DocumentStore, batch_cap: usize, dry_run: bool) -> Self {
        Self {
            store,
            batch_cap: batch_cap.max(1),
            dry_run,
            pending: Vec::new(),
            stats: CommitStats::default(),
        }
    }

    /// Stage one record under the given document id in both target
    /// collections. In dry-run mode the writes are counted as skipped and the
    /// store is never touched.
    pub async fn queue(
        &mut self,
        merchant_id: &str,
        doc_id: &str,
        record: &InventoryRecord,
    ) -> Result<()> {
        if self.dry_run {
            self.stats.skipped += 2;
            debug!(merchant_id, doc_id, "dry-run: skipping dual write");
            return Ok(());
        }

        let data = serde_json::to_value(record).context("serializing inventory record")?;
        self.push(WriteOp {
            collection: GLOBAL_INVENTORY.to_string(),
            doc_id: doc_id.to_string(),
            data: data.clone(),
        })
        .await?;
        self.push(WriteOp {
            collection: merchant_inventory_path(merchant_id),
            doc_id: doc_id.to_string(),
            data,
        })
        .await
    }

    async fn push(&mut self, op: WriteOp) -> Result<()> {
        self.pending.push(op);
        self.stats.queued += 1;
        if self.pending.len() >= self.batch_cap {
            self.flush().await?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let writes = std::mem::take(&mut self.pending);
        self.store
            .commit_batch(&writes)
            .await
            .context("committing write batch")?;
        self.stats.committed += writes.len() as u64;
        debug!(writes = writes.len(), total = self.stats.committed, "batch committed");
        Ok(())
    }

    pub fn writes_committed(&self) -> u64 {
        self.stats.committed
    }

    /// Commit the final partial batch and return the counters.
    pub async fn finish(mut self) -> Result<CommitStats> {
        self.flush().await?;
        if self.dry_run {
            info!(skipped = self.stats.skipped, "dry-run: no writes issued");
        }
        Ok(self.stats)
    }
}
