//! Typed client surface for the merchant catalog/location/inventory API.
//!
//! Wire payloads are loosely shaped; every type-specific field is optional and
//! absence is handled downstream with documented defaults rather than errors.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;

use crate::store::Document;

pub mod http;

#[cfg(test)]
pub mod fake;

/// One remote catalog entity, discriminated by `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum CatalogObject {
    #[serde(rename = "ITEM")]
    Item {
        id: String,
        #[serde(rename = "item_data", default)]
        data: ItemData,
    },
    #[serde(rename = "ITEM_VARIATION")]
    Variation {
        id: String,
        #[serde(rename = "item_variation_data", default)]
        data: VariationData,
    },
    #[serde(rename = "CATEGORY")]
    Category {
        id: String,
        #[serde(rename = "category_data", default)]
        data: CategoryData,
    },
    #[serde(rename = "TAX")]
    Tax {
        id: String,
        #[serde(rename = "tax_data", default)]
        data: TaxData,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemData {
    pub name: Option<String>,
    /// Legacy single-category field; wins over `categories` when present.
    pub category_id: Option<String>,
    #[serde(default)]
    pub categories: Vec<CategoryRef>,
    #[serde(default)]
    pub tax_ids: Vec<String>,
    #[serde(default)]
    pub image_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryRef {
    pub id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VariationData {
    pub item_id: Option<String>,
    pub name: Option<String>,
    pub sku: Option<String>,
    pub upc: Option<String>,
    pub price_money: Option<Money>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Money {
    /// Minor units (cents).
    pub amount: Option<i64>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryData {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaxData {
    pub name: Option<String>,
    pub percentage: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Location {
    pub id: String,
    pub name: Option<String>,
}

/// One stock observation for a catalog object at a location.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCount {
    pub catalog_object_id: String,
    pub location_id: Option<String>,
    /// Decimal string, e.g. "12" or "1.5".
    pub quantity: Option<String>,
    pub state: Option<String>,
    pub calculated_at: Option<String>,
}

#[derive(Debug, Default)]
pub struct CatalogPage {
    pub objects: Vec<CatalogObject>,
    pub cursor: Option<String>,
}

#[derive(Debug, Default)]
pub struct CountPage {
    pub counts: Vec<RawCount>,
    pub cursor: Option<String>,
}

/// A merchant registration read from the `merchants` collection.
#[derive(Debug, Clone)]
pub struct Merchant {
    pub id: String,
    pub name: Option<String>,
    pub access_token: Option<String>,
}

impl Merchant {
    pub fn from_document(doc: &Document) -> Self {
        let field = |key: &str| {
            doc.data
                .get(key)
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            id: doc.id.clone(),
            name: field("name"),
            access_token: field("access_token"),
        }
    }
}

/// Paged remote API consumed by the sync pipeline. Each call is awaited before
/// the next page is requested; there is no concurrent fetching per merchant.
#[async_trait]
pub trait InventoryApi: Send + Sync {
    /// One page of the catalog listing filtered to items, variations,
    /// categories and taxes. A returned cursor signals more pages remain.
    async fn list_catalog_page(&self, cursor: Option<&str>) -> Result<CatalogPage>;

    async fn list_locations(&self) -> Result<Vec<Location>>;

    /// One page of batch stock counts for the given locations.
    async fn batch_retrieve_counts(
        &self,
        location_ids: &[String],
        cursor: Option<&str>,
    ) -> Result<CountPage>;
}

/// Builds an authenticated API client for one merchant.
pub trait ApiFactory: Send + Sync {
    fn for_merchant(&self, merchant: &Merchant) -> Result<Box<dyn InventoryApi>>;
}
