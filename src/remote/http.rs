//! HTTP implementation of [`InventoryApi`] against a Square-shaped REST API.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use super::{
    ApiFactory, CatalogObject, CatalogPage, CountPage, InventoryApi, Location, Merchant, RawCount,
};

pub const DEFAULT_API_BASE: &str = "https://connect.squareup.com";

const CATALOG_TYPES: &str = "ITEM,ITEM_VARIATION,CATEGORY,TAX";

fn truncate_for_log(mut s: String, max_len: usize) -> String {
    if s.len() > max_len {
        s.truncate(max_len);
        s.push('…');
    }
    s
}

#[derive(Debug, Clone)]
pub struct HttpInventoryApi {
    base_url: String,
    http: Client,
    token: String,
}

#[derive(Debug, Deserialize)]
struct CatalogListResponse {
    #[serde(default)]
    objects: Vec<CatalogObject>,
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LocationListResponse {
    #[serde(default)]
    locations: Vec<Location>,
}

#[derive(Debug, Deserialize)]
struct BatchCountsResponse {
    #[serde(default)]
    counts: Vec<RawCount>,
    cursor: Option<String>,
}

impl HttpInventoryApi {
    pub fn new(base_url: &str, token: String, http: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
            token,
        }
    }
}

#[async_trait]
impl InventoryApi for HttpInventoryApi {
    async fn list_catalog_page(&self, cursor: Option<&str>) -> Result<CatalogPage> {
        let url = format!("{}/v2/catalog/list", self.base_url);
        let mut req = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .query(&[("types", CATALOG_TYPES)]);
        if let Some(cursor) = cursor {
            req = req.query(&[("cursor", cursor)]);
        }

        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = truncate_for_log(resp.text().await.unwrap_or_default(), 2000);
            return Err(anyhow!("catalog list failed: {status} url={url} body={body}"));
        }

        let body: CatalogListResponse = resp.json().await.context("decoding catalog list")?;
        Ok(CatalogPage {
            objects: body.objects,
            cursor: body.cursor,
        })
    }

    async fn list_locations(&self) -> Result<Vec<Location>> {
        let url = format!("{}/v2/locations", self.base_url);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = truncate_for_log(resp.text().await.unwrap_or_default(), 2000);
            return Err(anyhow!(
                "location list failed: {status} url={url} body={body}"
            ));
        }

        let body: LocationListResponse = resp.json().await.context("decoding location list")?;
        Ok(body.locations)
    }

    async fn batch_retrieve_counts(
        &self,
        location_ids: &[String],
        cursor: Option<&str>,
    ) -> Result<CountPage> {
        let url = format!("{}/v2/inventory/counts/batch-retrieve", self.base_url);
        let mut payload = json!({ "location_ids": location_ids });
        if let Some(cursor) = cursor {
            payload["cursor"] = json!(cursor);
        }

        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .json(&payload)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = truncate_for_log(resp.text().await.unwrap_or_default(), 2000);
            return Err(anyhow!(
                "inventory counts fetch failed: {status} url={url} locations={location_ids:?} body={body}"
            ));
        }

        let body: BatchCountsResponse = resp.json().await.context("decoding inventory counts")?;
        Ok(CountPage {
            counts: body.counts,
            cursor: body.cursor,
        })
    }
}

/// Builds one [`HttpInventoryApi`] per merchant, using the merchant's stored
/// access token or the configured fallback token.
pub struct HttpApiFactory {
    base_url: String,
    fallback_token: Option<String>,
    http: Client,
}

impl HttpApiFactory {
    pub fn new(
        base_url: Option<&str>,
        fallback_token: Option<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self> {
        let base_url = base_url
            .unwrap_or(DEFAULT_API_BASE)
            .trim_end_matches('/')
            .to_string();
        let http = Client::builder()
            .user_agent("shelfsync/0.1")
            .timeout(Duration::from_secs(timeout_secs.unwrap_or(30)))
            .build()?;
        Ok(Self {
            base_url,
            fallback_token,
            http,
        })
    }

    pub fn from_env() -> Result<Self> {
        use crate::util::env::{env_opt, env_parse_opt};
        Self::new(
            env_opt("SYNC_API_BASE").as_deref(),
            env_opt("SYNC_API_TOKEN"),
            env_parse_opt("SYNC_API_TIMEOUT_SECS"),
        )
    }
}

impl ApiFactory for HttpApiFactory {
    fn for_merchant(&self, merchant: &Merchant) -> Result<Box<dyn InventoryApi>> {
        let token = merchant
            .access_token
            .clone()
            .or_else(|| self.fallback_token.clone())
            .ok_or_else(|| anyhow!("merchant {} has no access token", merchant.id))?;
        Ok(Box::new(HttpInventoryApi::new(
            &self.base_url,
            token,
            self.http.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_requires_some_token() {
        let factory = HttpApiFactory::new(None, None, Some(5)).unwrap();
        let merchant = Merchant {
            id: "M1".into(),
            name: None,
            access_token: None,
        };
        assert!(factory.for_merchant(&merchant).is_err());
    }

    #[test]
    fn catalog_object_payloads_decode_with_missing_fields() {
        let raw = serde_json::json!({
            "type": "ITEM_VARIATION",
            "id": "V1",
            "item_variation_data": { "sku": "SK-1" }
        });
        let obj: CatalogObject = serde_json::from_value(raw).unwrap();
        match obj {
            CatalogObject::Variation { id, data } => {
                assert_eq!(id, "V1");
                assert_eq!(data.sku.as_deref(), Some("SK-1"));
                assert!(data.item_id.is_none());
                assert!(data.price_money.is_none());
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
