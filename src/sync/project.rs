//! Pure projection of a raw stock count plus the catalog index into the
//! denormalized [`InventoryRecord`]. Missing payload fields never fail a
//! record; each one has a documented default:
//!
//! - item_name: "Unknown" when the parent item (or its name) is absent
//! - variation_name / sku / gtin / price / currency: null when unresolved
//! - category: legacy `category_id` wins, else first `categories` entry, else null
//! - tax names/percentages: unresolved ids dropped, each list filtered independently
//! - qty: 0.0 when the quantity string is absent or unparseable
//! - state: "UNKNOWN" when the count carries none

use chrono::{DateTime, Utc};

use crate::remote::{Location, Merchant, RawCount};
use crate::sync::catalog::CatalogIndex;
use crate::sync::record::InventoryRecord;

pub fn project_record(
    merchant: &Merchant,
    location: &Location,
    count: &RawCount,
    index: &CatalogIndex,
    now: DateTime<Utc>,
) -> InventoryRecord {
    let variation = index.variations.get(&count.catalog_object_id);
    let item_id = variation.and_then(|v| v.item_id.clone());
    let item = item_id.as_deref().and_then(|id| index.items.get(id));

    let category_id = item.and_then(|i| {
        i.category_id
            .clone()
            .or_else(|| i.categories.first().and_then(|c| c.id.clone()))
    });
    let category_name = category_id
        .as_deref()
        .and_then(|id| index.categories.get(id))
        .and_then(|c| c.name.clone());

    let tax_ids = item.map(|i| i.tax_ids.clone()).unwrap_or_default();
    let tax_names: Vec<String> = tax_ids
        .iter()
        .filter_map(|id| index.taxes.get(id))
        .filter_map(|t| t.name.clone())
        .collect();
    let tax_percentages: Vec<String> = tax_ids
        .iter()
        .filter_map(|id| index.taxes.get(id))
        .filter_map(|t| t.percentage.clone())
        .collect();

    let price_money = variation.and_then(|v| v.price_money.as_ref());
    let price = price_money.and_then(|m| m.amount).map(|a| a as f64 / 100.0);
    let currency = price_money.and_then(|m| m.currency.clone());

    let state = count
        .state
        .clone()
        .unwrap_or_else(|| "UNKNOWN".to_string());

    InventoryRecord {
        merchant_id: merchant.id.clone(),
        merchant_name: merchant.name.clone(),
        location_id: count
            .location_id
            .clone()
            .unwrap_or_else(|| location.id.clone()),
        location_name: location.name.clone(),
        catalog_object_id: Some(count.catalog_object_id.clone()),
        item_id,
        variation_id: variation.map(|_| count.catalog_object_id.clone()),
        item_name: item
            .and_then(|i| i.name.clone())
            .unwrap_or_else(|| "Unknown".to_string()),
        variation_name: variation.and_then(|v| v.name.clone()),
        sku: variation.and_then(|v| v.sku.clone()),
        gtin: variation.and_then(|v| v.upc.clone()),
        category_id,
        category_name,
        tax_ids,
        tax_names,
        tax_percentages,
        price,
        currency,
        qty: count
            .quantity
            .as_deref()
            .and_then(|q| q.parse::<f64>().ok())
            .unwrap_or(0.0),
        state,
        calculated_at: count.calculated_at.clone(),
        updated_at: now,
        image_ids: item.map(|i| i.image_ids.clone()).unwrap_or_default(),
        synthetic: false,
        synthetic_reason: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::fake::{count, location, merchant};
    use crate::remote::{CategoryData, CategoryRef, ItemData, Money, TaxData, VariationData};
    use chrono::TimeZone;

    fn fixture_index() -> CatalogIndex {
        let mut index = CatalogIndex::default();
        index.items.insert(
            "I1".into(),
            ItemData {
                name: Some("Espresso Beans".into()),
                category_id: Some("C-legacy".into()),
                categories: vec![CategoryRef {
                    id: Some("C-list".into()),
                }],
                tax_ids: vec!["T1".into(), "T-unknown".into(), "T2".into()],
                image_ids: vec!["IMG1".into()],
            },
        );
        index.variations.insert(
            "V1".into(),
            VariationData {
                item_id: Some("I1".into()),
                name: Some("250g".into()),
                sku: Some("SK-250".into()),
                upc: Some("0123456789012".into()),
                price_money: Some(Money {
                    amount: Some(1250),
                    currency: Some("USD".into()),
                }),
            },
        );
        index.categories.insert(
            "C-legacy".into(),
            CategoryData {
                name: Some("Coffee".into()),
            },
        );
        index.categories.insert(
            "C-list".into(),
            CategoryData {
                name: Some("Beverages".into()),
            },
        );
        index.taxes.insert(
            "T1".into(),
            TaxData {
                name: Some("VAT".into()),
                percentage: Some("20".into()),
            },
        );
        // Resolvable tax with no percentage: name survives, percentage dropped.
        index.taxes.insert(
            "T2".into(),
            TaxData {
                name: Some("City".into()),
                percentage: None,
            },
        );
        index
    }

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn projection_is_idempotent() {
        let index = fixture_index();
        let m = merchant("M1", "Acme Roasters");
        let l = location("L1", "Downtown");
        let c = count("V1", "L1", "7", "IN_STOCK");

        let a = project_record(&m, &l, &c, &index, now());
        let b = project_record(&m, &l, &c, &index, now());
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn resolves_full_relationship_chain() {
        let index = fixture_index();
        let rec = project_record(
            &merchant("M1", "Acme Roasters"),
            &location("L1", "Downtown"),
            &count("V1", "L1", "7", "IN_STOCK"),
            &index,
            now(),
        );

        assert_eq!(rec.item_id.as_deref(), Some("I1"));
        assert_eq!(rec.variation_id.as_deref(), Some("V1"));
        assert_eq!(rec.item_name, "Espresso Beans");
        assert_eq!(rec.variation_name.as_deref(), Some("250g"));
        assert_eq!(rec.sku.as_deref(), Some("SK-250"));
        assert_eq!(rec.gtin.as_deref(), Some("0123456789012"));
        assert_eq!(rec.price, Some(12.5));
        assert_eq!(rec.currency.as_deref(), Some("USD"));
        assert_eq!(rec.qty, 7.0);
        assert_eq!(rec.image_ids, vec!["IMG1".to_string()]);
        assert!(!rec.synthetic);
    }

    #[test]
    fn legacy_category_id_wins_over_reference_list() {
        let index = fixture_index();
        let rec = project_record(
            &merchant("M1", "Acme Roasters"),
            &location("L1", "Downtown"),
            &count("V1", "L1", "7", "IN_STOCK"),
            &index,
            now(),
        );
        assert_eq!(rec.category_id.as_deref(), Some("C-legacy"));
        assert_eq!(rec.category_name.as_deref(), Some("Coffee"));

        let mut index = fixture_index();
        index.items.get_mut("I1").unwrap().category_id = None;
        let rec = project_record(
            &merchant("M1", "Acme Roasters"),
            &location("L1", "Downtown"),
            &count("V1", "L1", "7", "IN_STOCK"),
            &index,
            now(),
        );
        assert_eq!(rec.category_id.as_deref(), Some("C-list"));
        assert_eq!(rec.category_name.as_deref(), Some("Beverages"));
    }

    #[test]
    fn unresolved_taxes_are_dropped_independently() {
        let index = fixture_index();
        let rec = project_record(
            &merchant("M1", "Acme Roasters"),
            &location("L1", "Downtown"),
            &count("V1", "L1", "7", "IN_STOCK"),
            &index,
            now(),
        );

        // T-unknown dropped from both; T2 keeps its name but has no percentage.
        assert_eq!(rec.tax_ids.len(), 3);
        assert_eq!(rec.tax_names, vec!["VAT".to_string(), "City".to_string()]);
        assert_eq!(rec.tax_percentages, vec!["20".to_string()]);
    }

    #[test]
    fn unknown_variation_falls_back_to_defaults() {
        let index = fixture_index();
        let rec = project_record(
            &merchant("M1", "Acme Roasters"),
            &location("L1", "Downtown"),
            &count("V-missing", "L1", "not-a-number", "IN_STOCK"),
            &index,
            now(),
        );

        assert_eq!(rec.item_name, "Unknown");
        assert!(rec.item_id.is_none());
        assert!(rec.variation_id.is_none());
        assert!(rec.sku.is_none());
        assert!(rec.gtin.is_none());
        assert!(rec.price.is_none());
        assert_eq!(rec.qty, 0.0);
    }
}
