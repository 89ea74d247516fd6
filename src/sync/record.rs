//! The persisted, denormalized inventory record and its deterministic
//! document identity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State used for synthesized placeholder records. Remote count states
/// (IN_STOCK, SOLD, ...) never take this value, which keeps live and
/// placeholder document ids disjoint.
pub const PLACEHOLDER_STATE: &str = "MISSING";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryRecord {
    pub merchant_id: String,
    pub merchant_name: Option<String>,
    pub location_id: String,
    pub location_name: Option<String>,
    pub catalog_object_id: Option<String>,
    pub item_id: Option<String>,
    pub variation_id: Option<String>,
    pub item_name: String,
    pub variation_name: Option<String>,
    pub sku: Option<String>,
    pub gtin: Option<String>,
    pub category_id: Option<String>,
    pub category_name: Option<String>,
    pub tax_ids: Vec<String>,
    pub tax_names: Vec<String>,
    pub tax_percentages: Vec<String>,
    /// Major currency units (minor / 100).
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub qty: f64,
    pub state: String,
    pub calculated_at: Option<String>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub image_ids: Vec<String>,
    #[serde(default)]
    pub synthetic: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synthetic_reason: Option<String>,
}

/// Document id for a record produced by ingestion. Repeated observations of
/// the same (merchant, location, object, state) converge on one document.
pub fn live_record_id(
    merchant_id: &str,
    location_id: &str,
    catalog_object_id: &str,
    state: &str,
) -> String {
    format!("{merchant_id}_{location_id}_{catalog_object_id}_{state}")
}

/// Document id for a synthesized placeholder. Uses the sanitized GTIN plus a
/// fixed suffix, so it can never equal a live record id.
pub fn placeholder_record_id(merchant_id: &str, location_id: &str, gtin: &str) -> String {
    format!(
        "{merchant_id}_{location_id}_{}_{PLACEHOLDER_STATE}",
        sanitize_gtin(gtin)
    )
}

/// Replace every non-alphanumeric character so the GTIN is safe inside a
/// document id. Used for identity only, never for set membership.
pub fn sanitize_gtin(gtin: &str) -> String {
    gtin.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
