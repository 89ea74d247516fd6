//! Pages each merchant's stored inventory (key-ordered, resume after the last
//! seen document id) into coverage state: per-merchant GTIN sets, the global
//! union, one sample projection per GTIN, and each merchant's default
//! location. All accumulator state is owned by the scan call and handed back
//! in the report.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

use crate::remote::Merchant;
use crate::store::{merchant_inventory_path, DocumentStore, Query};

pub const SCAN_PAGE_SIZE: i64 = 500;

/// Lenient view of a stored record; the scan tolerates documents written by
/// older versions with missing fields.
#[derive(Debug, Clone, Default, Deserialize)]
struct ScannedRecord {
    #[serde(default)]
    gtin: Option<String>,
    #[serde(default)]
    location_id: Option<String>,
    #[serde(default)]
    location_name: Option<String>,
    #[serde(default)]
    item_name: Option<String>,
    #[serde(default)]
    variation_name: Option<String>,
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    category_name: Option<String>,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    image_ids: Vec<String>,
    #[serde(default)]
    tax_ids: Vec<String>,
    #[serde(default)]
    tax_names: Vec<String>,
    #[serde(default)]
    tax_percentages: Vec<String>,
    #[serde(default)]
    synthetic: bool,
}

/// Sample projection captured on first sighting of a GTIN; used to synthesize
/// placeholders for merchants missing that GTIN.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GtinSample {
    pub item_name: Option<String>,
    pub variation_name: Option<String>,
    pub sku: Option<String>,
    pub category_name: Option<String>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub image_ids: Vec<String>,
    pub tax_ids: Vec<String>,
    pub tax_names: Vec<String>,
    pub tax_percentages: Vec<String>,
}

#[derive(Debug, Default)]
pub struct CoverageReport {
    pub global_gtins: BTreeSet<String>,
    pub merchant_gtins: HashMap<String, BTreeSet<String>>,
    pub samples: HashMap<String, GtinSample>,
    /// First non-empty (location_id, location_name) pair seen per merchant.
    pub default_locations: HashMap<String, (String, String)>,
    pub records_scanned: u64,
    pub placeholders_seen: u64,
    /// True when the scan stopped early at the global sample limit.
    pub truncated: bool,
}

impl CoverageReport {
    /// GTINs present somewhere in the fleet but absent from this merchant.
    pub fn missing_for(&self, merchant_id: &str) -> BTreeSet<String> {
        let owned = self.merchant_gtins.get(merchant_id);
        self.global_gtins
            .iter()
            .filter(|g| owned.map_or(true, |set| !set.contains(*g)))
            .cloned()
            .collect()
    }
}

fn sample_from(rec: &ScannedRecord) -> GtinSample {
    GtinSample {
        item_name: rec.item_name.clone(),
        variation_name: rec.variation_name.clone(),
        sku: rec.sku.clone(),
        category_name: rec.category_name.clone(),
        price: rec.price,
        currency: rec.currency.clone(),
        image_ids: rec.image_ids.clone(),
        tax_ids: rec.tax_ids.clone(),
        tax_names: rec.tax_names.clone(),
        tax_percentages: rec.tax_percentages.clone(),
    }
}

pub async fn scan_coverage(
    store: &dyn DocumentStore,
    merchants: &[Merchant],
    sample_limit: Option<usize>,
) -> Result<CoverageReport> {
    let mut report = CoverageReport::default();

    'merchants: for merchant in merchants {
        let collection = merchant_inventory_path(&merchant.id);
        let merchant_set = report.merchant_gtins.entry(merchant.id.clone()).or_default();
        let mut last_key: Option<String> = None;

        loop {
            let mut query = Query::collection(&collection).limit(SCAN_PAGE_SIZE);
            if let Some(key) = &last_key {
                query = query.start_after(key);
            }
            let page = store
                .list(&query)
                .await
                .with_context(|| format!("scanning inventory for merchant {}", merchant.id))?;
            if page.is_empty() {
                break;
            }
            last_key = page.last().map(|d| d.id.clone());

            for doc in page {
                report.records_scanned += 1;
                let rec: ScannedRecord = serde_json::from_value(doc.data).unwrap_or_default();
                if rec.synthetic {
                    report.placeholders_seen += 1;
                }

                if !report.default_locations.contains_key(&merchant.id) {
                    if let (Some(id), Some(name)) = (&rec.location_id, &rec.location_name) {
                        if !id.is_empty() && !name.is_empty() {
                            report
                                .default_locations
                                .insert(merchant.id.clone(), (id.clone(), name.clone()));
                        }
                    }
                }

                let Some(gtin) = rec.gtin.as_deref().filter(|g| !g.is_empty()) else {
                    continue;
                };
                merchant_set.insert(gtin.to_string());
                if report.global_gtins.insert(gtin.to_string()) {
                    report.samples.insert(gtin.to_string(), sample_from(&rec));
                }

                if let Some(limit) = sample_limit {
                    if report.global_gtins.len() >= limit {
                        info!(limit, "global GTIN sample limit reached; stopping scan");
                        report.truncated = true;
                        break 'merchants;
                    }
                }
            }
        }

        debug!(
            merchant_id = %merchant.id,
            gtins = report
                .merchant_gtins
                .get(&merchant.id)
                .map_or(0, BTreeSet::len),
            "merchant coverage scanned"
        );
    }

    info!(
        merchants = merchants.len(),
        global_gtins = report.global_gtins.len(),
        records = report.records_scanned,
        placeholders = report.placeholders_seen,
        truncated = report.truncated,
        "coverage scan complete"
    );
    Ok(report)
}
