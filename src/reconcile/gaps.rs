//! Fills cross-merchant coverage gaps: for every merchant, each GTIN in the
//! global union it does not carry gets a synthetic placeholder record under a
//! deterministic id that can never collide with a live record. Defaults to
//! dry-run because one run can create thousands of documents fleet-wide.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::reconcile::scan::{CoverageReport, GtinSample};
use crate::remote::Merchant;
use crate::store::DocumentStore;
use crate::sync::commit::DualWriteCommitter;
use crate::sync::record::{placeholder_record_id, InventoryRecord, PLACEHOLDER_STATE};

pub const SYNTHETIC_REASON: &str = "missing_in_merchant_sync";
pub const FALLBACK_LOCATION_ID: &str = "DEFAULT";
pub const FALLBACK_LOCATION_NAME: &str = "Default Location";

#[derive(Debug, Serialize)]
pub struct ReconcileSummary {
    pub merchants: usize,
    pub placeholders: u64,
    pub writes_committed: u64,
    pub dry_run: bool,
}

pub async fn reconcile_gaps(
    store: &dyn DocumentStore,
    report: &CoverageReport,
    merchants: &[Merchant],
    dry_run: bool,
    batch_cap: usize,
) -> Result<ReconcileSummary> {
    let mut committer = DualWriteCommitter::new(store, batch_cap, dry_run);
    let mut placeholders = 0u64;

    for merchant in merchants {
        let missing = report.missing_for(&merchant.id);
        if missing.is_empty() {
            debug!(merchant_id = %merchant.id, "no coverage gaps");
            continue;
        }
        let (location_id, location_name) = report
            .default_locations
            .get(&merchant.id)
            .cloned()
            .unwrap_or_else(|| {
                (
                    FALLBACK_LOCATION_ID.to_string(),
                    FALLBACK_LOCATION_NAME.to_string(),
                )
            });
        info!(
            merchant_id = %merchant.id,
            missing = missing.len(),
            location_id = %location_id,
            dry_run,
            "synthesizing placeholder records"
        );

        let now = Utc::now();
        for gtin in &missing {
            let record = placeholder_record(
                merchant,
                &location_id,
                &location_name,
                gtin,
                report.samples.get(gtin),
                now,
            );
            let doc_id = placeholder_record_id(&merchant.id, &location_id, gtin);
            committer.queue(&merchant.id, &doc_id, &record).await?;
            placeholders += 1;
        }
    }

    let stats = committer.finish().await?;
    info!(
        placeholders,
        committed = stats.committed,
        dry_run,
        "gap reconciliation finished"
    );
    Ok(ReconcileSummary {
        merchants: merchants.len(),
        placeholders,
        writes_committed: stats.committed,
        dry_run,
    })
}

fn placeholder_record(
    merchant: &Merchant,
    location_id: &str,
    location_name: &str,
    gtin: &str,
    sample: Option<&GtinSample>,
    now: DateTime<Utc>,
) -> InventoryRecord {
    // No sample means the GTIN alone has to carry the record.
    let sample = sample.cloned().unwrap_or_default();
    InventoryRecord {
        merchant_id: merchant.id.clone(),
        merchant_name: merchant.name.clone(),
        location_id: location_id.to_string(),
        location_name: Some(location_name.to_string()),
        catalog_object_id: None,
        item_id: None,
        variation_id: None,
        item_name: sample.item_name.unwrap_or_else(|| "Unknown".to_string()),
        variation_name: sample.variation_name,
        sku: sample.sku,
        gtin: Some(gtin.to_string()),
        category_id: None,
        category_name: sample.category_name,
        tax_ids: sample.tax_ids,
        tax_names: sample.tax_names,
        tax_percentages: sample.tax_percentages,
        price: sample.price,
        currency: sample.currency,
        qty: 0.0,
        state: PLACEHOLDER_STATE.to_string(),
        calculated_at: None,
        updated_at: now,
        image_ids: sample.image_ids,
        synthetic: true,
        synthetic_reason: Some(SYNTHETIC_REASON.to_string()),
    }
}
