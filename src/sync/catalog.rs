//! Builds the per-merchant catalog index: four id→payload maps assembled from
//! the paged catalog listing. The index is owned by one merchant pass and
//! dropped when that pass ends; nothing is shared across merchants.

use anyhow::{Context, Result};
use std::collections::HashMap;
use tracing::debug;

use crate::remote::{CatalogObject, CategoryData, InventoryApi, ItemData, TaxData, VariationData};

#[derive(Debug, Default)]
pub struct CatalogIndex {
    pub items: HashMap<String, ItemData>,
    pub variations: HashMap<String, VariationData>,
    pub categories: HashMap<String, CategoryData>,
    pub taxes: HashMap<String, TaxData>,
}

/// Pages the catalog listing until the cursor runs out. There is no page cap
/// here; the remote API is trusted to terminate, and any fetch error rolls up
/// to the caller's per-merchant boundary.
pub async fn build_catalog_index(api: &dyn InventoryApi) -> Result<CatalogIndex> {
    let mut index = CatalogIndex::default();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = api
            .list_catalog_page(cursor.as_deref())
            .await
            .context("fetching catalog page")?;
        pages += 1;

        for object in page.objects {
            match object {
                CatalogObject::Item { id, data } => {
                    index.items.insert(id, data);
                }
                CatalogObject::Variation { id, data } => {
                    index.variations.insert(id, data);
                }
                CatalogObject::Category { id, data } => {
                    index.categories.insert(id, data);
                }
                CatalogObject::Tax { id, data } => {
                    index.taxes.insert(id, data);
                }
            }
        }

        cursor = match page.cursor {
            Some(c) if !c.is_empty() => Some(c),
            _ => break,
        };
    }

    debug!(
        pages,
        items = index.items.len(),
        variations = index.variations.len(),
        categories = index.categories.len(),
        taxes = index.taxes.len(),
        "catalog index built"
    );
    Ok(index)
}
