//! Drives one full ingestion run: list merchants, then for each merchant
//! sequentially build the catalog index, page every location's counts,
//! project and commit. A failing merchant is logged and skipped; failing to
//! list merchants at all is fatal and aborts the run.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::remote::{ApiFactory, Merchant};
use crate::store::{DocumentStore, Query, MERCHANTS};
use crate::sync::catalog::build_catalog_index;
use crate::sync::commit::{CommitStats, DualWriteCommitter, DEFAULT_BATCH_CAP};
use crate::sync::inventory::fetch_location_counts;
use crate::sync::project::project_record;
use crate::sync::record::live_record_id;

#[derive(Debug, Default, Serialize)]
pub struct SyncSummary {
    pub merchants: usize,
    pub merchants_failed: usize,
    pub records: u64,
    pub writes_committed: u64,
}

pub struct SyncOrchestrator<'a> {
    store: &'a dyn DocumentStore,
    api: &'a dyn ApiFactory,
    batch_cap: usize,
}

impl<'a> SyncOrchestrator<'a> {
    pub fn new(store: &'a dyn DocumentStore, api: &'a dyn ApiFactory) -> Self {
        Self {
            store,
            api,
            batch_cap: DEFAULT_BATCH_CAP,
        }
    }

    pub fn with_batch_cap(mut self, batch_cap: usize) -> Self {
        self.batch_cap = batch_cap;
        self
    }

    pub async fn run(&self) -> Result<SyncSummary> {
        let merchants = list_merchants(self.store)
            .await
            .context("listing merchants")?;
        info!(merchants = merchants.len(), "starting full sync");

        let mut summary = SyncSummary {
            merchants: merchants.len(),
            ..Default::default()
        };
        for merchant in &merchants {
            match self.sync_merchant(merchant).await {
                Ok((records, stats)) => {
                    summary.records += records;
                    summary.writes_committed += stats.committed;
                }
                Err(error) => {
                    summary.merchants_failed += 1;
                    warn!(
                        merchant_id = %merchant.id,
                        error = ?error,
                        "merchant sync failed; continuing with the next merchant"
                    );
                }
            }
        }

        info!(
            merchants = summary.merchants,
            failed = summary.merchants_failed,
            records = summary.records,
            writes = summary.writes_committed,
            "full sync finished"
        );
        Ok(summary)
    }

    async fn sync_merchant(&self, merchant: &Merchant) -> Result<(u64, CommitStats)> {
        let api = self.api.for_merchant(merchant)?;
        // The catalog index must be complete before any count is projected.
        let index = build_catalog_index(api.as_ref()).await?;
        let locations = api.list_locations().await.context("listing locations")?;
        info!(
            merchant_id = %merchant.id,
            locations = locations.len(),
            "merchant catalog indexed"
        );

        let mut committer = DualWriteCommitter::new(self.store, self.batch_cap, false);
        let mut records = 0u64;
        for location in &locations {
            let counts = fetch_location_counts(api.as_ref(), &location.id).await?;
            for count in &counts {
                let record = project_record(merchant, location, count, &index, Utc::now());
                let doc_id = live_record_id(
                    &record.merchant_id,
                    &record.location_id,
                    &count.catalog_object_id,
                    &record.state,
                );
                committer.queue(&merchant.id, &doc_id, &record).await?;
                records += 1;
            }
            info!(
                merchant_id = %merchant.id,
                location_id = %location.id,
                counts = counts.len(),
                "location projected"
            );
        }

        let stats = committer.finish().await?;
        info!(
            merchant_id = %merchant.id,
            records,
            committed = stats.committed,
            "merchant sync complete"
        );
        Ok((records, stats))
    }
}

pub async fn list_merchants(store: &dyn DocumentStore) -> Result<Vec<Merchant>> {
    let docs = store.list(&Query::collection(MERCHANTS)).await?;
    Ok(docs.iter().map(Merchant::from_document).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::fake::{count, location, ScriptedApi, ScriptedFactory};
    use crate::remote::{CatalogObject, CategoryData, ItemData, VariationData};
    use crate::store::memory::MemoryStore;
    use std::collections::HashMap;

    fn seed_merchant(store: &MemoryStore, id: &str, name: &str) {
        store.insert(
            MERCHANTS,
            id,
            serde_json::json!({ "name": name, "access_token": "tok" }),
        );
    }

    fn scripted_catalog() -> Vec<Vec<CatalogObject>> {
        vec![vec![
            CatalogObject::Item {
                id: "I1".into(),
                data: ItemData {
                    name: Some("Espresso Beans".into()),
                    category_id: Some("C1".into()),
                    ..Default::default()
                },
            },
            CatalogObject::Variation {
                id: "V1".into(),
                data: VariationData {
                    item_id: Some("I1".into()),
                    upc: Some("0123456789012".into()),
                    ..Default::default()
                },
            },
            CatalogObject::Category {
                id: "C1".into(),
                data: CategoryData {
                    name: Some("Coffee".into()),
                },
            },
        ]]
    }

    #[tokio::test]
    async fn one_count_lands_in_both_collections_with_resolved_names() {
        let store = MemoryStore::new();
        seed_merchant(&store, "M1", "Acme Roasters");

        let api = ScriptedApi {
            catalog_pages: scripted_catalog(),
            locations: vec![location("L1", "Downtown"), location("L2", "Harbor")],
            count_pages: HashMap::from([(
                "L1".to_string(),
                vec![vec![count("V1", "L1", "4", "IN_STOCK")]],
            )]),
            ..Default::default()
        };
        let factory = ScriptedFactory {
            apis: HashMap::from([("M1".to_string(), api)]),
        };

        let summary = SyncOrchestrator::new(&store, &factory).run().await.unwrap();
        assert_eq!(summary.merchants, 1);
        assert_eq!(summary.merchants_failed, 0);
        assert_eq!(summary.records, 1);
        // One record, two collections.
        assert_eq!(summary.writes_committed, 2);

        let doc_id = live_record_id("M1", "L1", "V1", "IN_STOCK");
        let global = store.get("inventory", &doc_id).await.unwrap().unwrap();
        let scoped = store
            .get("merchants/M1/inventory", &doc_id)
            .await
            .unwrap()
            .unwrap();
        for doc in [&global, &scoped] {
            assert_eq!(doc["item_name"], "Espresso Beans");
            assert_eq!(doc["category_name"], "Coffee");
            assert_eq!(doc["merchant_name"], "Acme Roasters");
            assert_eq!(doc["location_name"], "Downtown");
        }
    }

    #[tokio::test]
    async fn failing_merchant_does_not_abort_the_run() {
        let store = MemoryStore::new();
        seed_merchant(&store, "M1", "Broken");
        seed_merchant(&store, "M2", "Healthy");

        let broken = ScriptedApi {
            fail_catalog: true,
            ..Default::default()
        };
        let healthy = ScriptedApi {
            catalog_pages: scripted_catalog(),
            locations: vec![location("L1", "Downtown")],
            count_pages: HashMap::from([(
                "L1".to_string(),
                vec![vec![count("V1", "L1", "2", "IN_STOCK")]],
            )]),
            ..Default::default()
        };
        let factory = ScriptedFactory {
            apis: HashMap::from([("M1".to_string(), broken), ("M2".to_string(), healthy)]),
        };

        let summary = SyncOrchestrator::new(&store, &factory).run().await.unwrap();
        assert_eq!(summary.merchants, 2);
        assert_eq!(summary.merchants_failed, 1);
        assert_eq!(summary.records, 1);
        assert_eq!(store.doc_count("merchants/M2/inventory"), 1);
        assert_eq!(store.doc_count("merchants/M1/inventory"), 0);
    }
}
