//! Scripted in-process [`InventoryApi`] used by unit tests. Cursors are page
//! indices rendered as strings; an `endless_counts` script never exhausts its
//! cursor, which is how the pagination cap is exercised.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;

use super::{
    ApiFactory, CatalogObject, CatalogPage, CountPage, InventoryApi, Location, Merchant, RawCount,
};

#[derive(Debug, Clone, Default)]
pub struct ScriptedApi {
    pub catalog_pages: Vec<Vec<CatalogObject>>,
    pub locations: Vec<Location>,
    /// Scripted count pages per location id.
    pub count_pages: HashMap<String, Vec<Vec<RawCount>>>,
    /// When set, count pages always return a cursor and one synthetic count.
    pub endless_counts: bool,
    /// When set, the first catalog page call fails.
    pub fail_catalog: bool,
}

fn parse_cursor(cursor: Option<&str>) -> usize {
    cursor.and_then(|c| c.parse().ok()).unwrap_or(0)
}

fn next_cursor(page: usize, total: usize) -> Option<String> {
    (page + 1 < total).then(|| (page + 1).to_string())
}

#[async_trait]
impl InventoryApi for ScriptedApi {
    async fn list_catalog_page(&self, cursor: Option<&str>) -> Result<CatalogPage> {
        if self.fail_catalog {
            return Err(anyhow!("scripted catalog failure"));
        }
        let page = parse_cursor(cursor);
        Ok(CatalogPage {
            objects: self.catalog_pages.get(page).cloned().unwrap_or_default(),
            cursor: next_cursor(page, self.catalog_pages.len()),
        })
    }

    async fn list_locations(&self) -> Result<Vec<Location>> {
        Ok(self.locations.clone())
    }

    async fn batch_retrieve_counts(
        &self,
        location_ids: &[String],
        cursor: Option<&str>,
    ) -> Result<CountPage> {
        let page = parse_cursor(cursor);
        if self.endless_counts {
            // Unique object per page so runaway loops would be visible.
            return Ok(CountPage {
                counts: vec![count(&format!("V{page}"), &location_ids[0], "1", "IN_STOCK")],
                cursor: Some((page + 1).to_string()),
            });
        }
        let pages = location_ids
            .first()
            .and_then(|id| self.count_pages.get(id))
            .cloned()
            .unwrap_or_default();
        Ok(CountPage {
            counts: pages.get(page).cloned().unwrap_or_default(),
            cursor: next_cursor(page, pages.len()),
        })
    }
}

/// Per-merchant scripted factory for orchestrator tests.
#[derive(Debug, Clone, Default)]
pub struct ScriptedFactory {
    pub apis: HashMap<String, ScriptedApi>,
}

impl ApiFactory for ScriptedFactory {
    fn for_merchant(&self, merchant: &Merchant) -> Result<Box<dyn InventoryApi>> {
        let api = self
            .apis
            .get(&merchant.id)
            .cloned()
            .ok_or_else(|| anyhow!("no scripted api for merchant {}", merchant.id))?;
        Ok(Box::new(api))
    }
}

pub fn location(id: &str, name: &str) -> Location {
    Location {
        id: id.to_string(),
        name: Some(name.to_string()),
    }
}

pub fn count(catalog_object_id: &str, location_id: &str, quantity: &str, state: &str) -> RawCount {
    RawCount {
        catalog_object_id: catalog_object_id.to_string(),
        location_id: Some(location_id.to_string()),
        quantity: Some(quantity.to_string()),
        state: Some(state.to_string()),
        calculated_at: Some("2026-08-01T00:00:00Z".to_string()),
    }
}

pub fn merchant(id: &str, name: &str) -> Merchant {
    Merchant {
        id: id.to_string(),
        name: Some(name.to_string()),
        access_token: Some("test-token".to_string()),
    }
}
