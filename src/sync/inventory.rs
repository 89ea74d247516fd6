//! Pages one location's batch stock counts. Pagination is bounded: after
//! `MAX_COUNT_PAGES` pages the loop stops without error, trading completeness
//! for forward progress against a misbehaving cursor.

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::remote::{InventoryApi, RawCount};

/// Safety cap on count pages fetched per location per run.
pub const MAX_COUNT_PAGES: usize = 50;

pub async fn fetch_location_counts(
    api: &dyn InventoryApi,
    location_id: &str,
) -> Result<Vec<RawCount>> {
    let location_ids = [location_id.to_string()];
    let mut counts: Vec<RawCount> = Vec::new();
    let mut cursor: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = api
            .batch_retrieve_counts(&location_ids, cursor.as_deref())
            .await
            .with_context(|| format!("fetching counts for location {location_id}"))?;
        pages += 1;
        counts.extend(page.counts);

        cursor = match page.cursor {
            Some(c) if !c.is_empty() => Some(c),
            _ => break,
        };
        if pages >= MAX_COUNT_PAGES {
            warn!(
                location_id,
                pages,
                counts = counts.len(),
                "inventory pagination hit the page cap; remaining pages skipped this run"
            );
            break;
        }
    }

    debug!(location_id, pages, counts = counts.len(), "location counts fetched");
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::fake::{count, ScriptedApi};
    use std::collections::HashMap;

    #[tokio::test]
    async fn accumulates_counts_until_cursor_runs_out() {
        let api = ScriptedApi {
            count_pages: HashMap::from([(
                "L1".to_string(),
                vec![
                    vec![count("V1", "L1", "3", "IN_STOCK")],
                    vec![count("V2", "L1", "1", "IN_STOCK")],
                ],
            )]),
            ..Default::default()
        };

        let counts = fetch_location_counts(&api, "L1").await.unwrap();
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].catalog_object_id, "V1");
        assert_eq!(counts[1].catalog_object_id, "V2");
    }

    #[tokio::test]
    async fn never_ending_cursor_stops_at_cap_without_error() {
        let api = ScriptedApi {
            endless_counts: true,
            ..Default::default()
        };

        let counts = fetch_location_counts(&api, "L1").await.unwrap();
        // One scripted count per page, so the cap is visible in the total.
        assert_eq!(counts.len(), MAX_COUNT_PAGES);
    }

    #[tokio::test]
    async fn unknown_location_yields_empty_single_page() {
        let api = ScriptedApi::default();
        let counts = fetch_location_counts(&api, "L-unknown").await.unwrap();
        assert!(counts.is_empty());
    }
}
