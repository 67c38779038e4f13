//! Async STAC item search
//!
//! Lightweight serde models and client for STAC Item Search (POST
//! /search), covering what scene discovery needs: bbox and datetime
//! filtering, collections, pagination via links, and the `eo:cloud_cover`
//! and `sar:polarizations` properties used to pre-screen scenes.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{CatalogError, Result};
use wastelens_core::{AreaOfInterest, DateWindow};

/// Default collection for optical scenes
pub const OPTICAL_COLLECTION: &str = "sentinel-2-l2a";
/// Default collection for radar scenes
pub const RADAR_COLLECTION: &str = "sentinel-1-grd";

// ---------------------------------------------------------------------------
// Search request
// ---------------------------------------------------------------------------

/// Body for `POST /search`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collections: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,

    /// Pagination token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounding box `[west, south, east, north]`
    pub fn bbox(mut self, west: f64, south: f64, east: f64, north: f64) -> Self {
        self.bbox = Some(vec![west, south, east, north]);
        self
    }

    /// Datetime range, e.g. `"2023-01-01/2023-04-01"`
    pub fn datetime(mut self, dt: &str) -> Self {
        self.datetime = Some(dt.to_string());
        self
    }

    pub fn collections(mut self, cols: &[&str]) -> Self {
        self.collections = Some(cols.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }
}

/// Search covering an AOI and window against the optical collection
pub fn optical_search(aoi: &AreaOfInterest, window: &DateWindow) -> SearchParams {
    aoi_search(aoi, window).collections(&[OPTICAL_COLLECTION])
}

/// Search covering an AOI and window against the radar collection
pub fn radar_search(aoi: &AreaOfInterest, window: &DateWindow) -> SearchParams {
    aoi_search(aoi, window).collections(&[RADAR_COLLECTION])
}

fn aoi_search(aoi: &AreaOfInterest, window: &DateWindow) -> SearchParams {
    SearchParams::new()
        .bbox(aoi.min_lon, aoi.min_lat, aoi.max_lon, aoi.max_lat)
        .datetime(&format!("{}/{}", window.start(), window.end()))
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// A STAC Item Collection (GeoJSON FeatureCollection)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ItemCollection {
    #[serde(rename = "type")]
    pub type_: String,

    pub features: Vec<Item>,

    #[serde(default)]
    pub links: Vec<Link>,
}

impl ItemCollection {
    /// Find the `"next"` pagination link, if any
    pub fn next_link(&self) -> Option<&Link> {
        self.links.iter().find(|l| l.rel == "next")
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// A single STAC Item (GeoJSON Feature)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Item {
    #[serde(rename = "type")]
    pub type_: String,

    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,

    pub properties: ItemProperties,

    #[serde(default)]
    pub assets: HashMap<String, Asset>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
}

impl Item {
    /// Scene-level cloud cover from `eo:cloud_cover`, if present
    pub fn cloud_cover(&self) -> Option<f64> {
        self.properties
            .extra
            .get("eo:cloud_cover")
            .and_then(|v| v.as_f64())
    }

    /// Polarizations from `sar:polarizations`, if present
    pub fn polarizations(&self) -> Vec<String> {
        self.properties
            .extra
            .get("sar:polarizations")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether this radar item carries both required polarizations
    pub fn has_dual_polarization(&self) -> bool {
        let pols = self.polarizations();
        pols.iter().any(|p| p == "VV") && pols.iter().any(|p| p == "VH")
    }

    /// Acquisition date parsed from the `datetime` property
    pub fn acquisition_date(&self) -> Option<chrono::NaiveDate> {
        let dt = self.properties.datetime.as_deref()?;
        dt.get(..10)
            .and_then(|d| chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    }
}

/// STAC item properties: datetime plus everything else as raw JSON
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ItemProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A STAC asset reference
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Asset {
    pub href: String,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,

    #[serde(default)]
    pub roles: Vec<String>,
}

/// A STAC link
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Link {
    pub rel: String,
    pub href: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Configuration for [`StacClient`]
pub struct StacClientOptions {
    /// Per-request timeout (default 30 s)
    pub request_timeout: Duration,
    /// Maximum retries on transient failures (default 3)
    pub max_retries: u32,
    /// Maximum total items to fetch across pages (default 200)
    pub max_items: usize,
}

impl Default for StacClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            max_retries: 3,
            max_items: 200,
        }
    }
}

/// Async client for STAC Item Search
pub struct StacClient {
    endpoint: String,
    client: reqwest::Client,
    options: StacClientOptions,
}

impl StacClient {
    /// Create a client for a STAC API root URL (the `/search` suffix is
    /// appended if missing)
    pub fn new(endpoint: &str, options: StacClientOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .build()
            .map_err(|e| CatalogError::Network(format!("failed to build HTTP client: {e}")))?;

        let base = endpoint.trim_end_matches('/');
        let endpoint = if base.ends_with("/search") {
            base.to_string()
        } else {
            format!("{base}/search")
        };

        Ok(Self {
            endpoint,
            client,
            options,
        })
    }

    /// The search URL this client posts to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Execute a single search request, one page of results
    pub async fn search(&self, params: &SearchParams) -> Result<ItemCollection> {
        self.post_search(&self.endpoint, params).await
    }

    /// Search with automatic pagination, collecting up to `max_items` items
    pub async fn search_all(&self, params: &SearchParams) -> Result<Vec<Item>> {
        let mut all_items: Vec<Item> = Vec::new();
        let max = self.options.max_items;

        let mut page = self.search(params).await?;
        loop {
            let next = page.next_link().cloned();
            all_items.extend(page.features.drain(..));
            if all_items.len() >= max {
                break;
            }
            match next {
                Some(link) => {
                    page = self.follow_next(&link, params).await?;
                    if page.is_empty() {
                        break;
                    }
                }
                None => break,
            }
        }

        all_items.truncate(max);
        debug!(items = all_items.len(), "STAC search complete");
        Ok(all_items)
    }

    async fn post_search(&self, url: &str, params: &SearchParams) -> Result<ItemCollection> {
        let mut last_err = None;

        for attempt in 0..=self.options.max_retries {
            if attempt > 0 {
                // exponential backoff: 500ms, 1s, 2s, ...
                let delay = Duration::from_millis(500 * (1 << (attempt - 1)));
                tokio::time::sleep(delay).await;
                warn!(attempt, "retrying STAC search");
            }

            let resp = self
                .client
                .post(url)
                .header("Content-Type", "application/json")
                .json(params)
                .send()
                .await;

            match resp {
                Ok(r) if r.status().is_success() => {
                    let body = r.text().await.map_err(|e| {
                        CatalogError::Network(format!("reading response body: {e}"))
                    })?;
                    return serde_json::from_str(&body)
                        .map_err(|e| CatalogError::Decode(format!("parsing STAC response: {e}")));
                }
                Ok(r) => {
                    let status = r.status();
                    let body = r.text().await.unwrap_or_default();
                    last_err = Some(CatalogError::Network(format!(
                        "STAC search returned HTTP {}: {}",
                        status,
                        body.chars().take(500).collect::<String>()
                    )));
                    // don't retry client errors
                    if status.is_client_error() {
                        break;
                    }
                }
                Err(e) => {
                    last_err = Some(CatalogError::Network(format!(
                        "STAC search request failed: {e}"
                    )));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| CatalogError::Network("STAC search failed".into())))
    }

    /// Follow a pagination link: POST with the link body, or plain GET
    async fn follow_next(&self, link: &Link, original: &SearchParams) -> Result<ItemCollection> {
        let method = link.method.as_deref().unwrap_or("GET").to_uppercase();

        if method == "POST" {
            let body = match &link.body {
                Some(link_body) => link_body.clone(),
                None => serde_json::to_value(original)
                    .map_err(|e| CatalogError::Decode(format!("serializing params: {e}")))?,
            };
            let merged: SearchParams = serde_json::from_value(body)
                .map_err(|e| CatalogError::Decode(format!("parsing pagination body: {e}")))?;
            self.post_search(&link.href, &merged).await
        } else {
            let resp = self
                .client
                .get(&link.href)
                .send()
                .await
                .map_err(|e| CatalogError::Network(format!("GET pagination: {e}")))?;
            if !resp.status().is_success() {
                return Err(CatalogError::Network(format!(
                    "STAC pagination returned HTTP {}",
                    resp.status()
                )));
            }
            let body = resp
                .text()
                .await
                .map_err(|e| CatalogError::Network(format!("reading pagination body: {e}")))?;
            serde_json::from_str(&body)
                .map_err(|e| CatalogError::Decode(format!("parsing pagination response: {e}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_params_serialization() {
        let aoi = AreaOfInterest::from_rect(30.5, 50.4, 30.6, 50.5, 0.0).unwrap();
        let window = DateWindow::new(
            chrono::NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2023, 4, 1).unwrap(),
        )
        .unwrap();

        let params = optical_search(&aoi, &window).limit(50);
        let json = serde_json::to_value(&params).unwrap();
        assert_eq!(json["collections"][0], OPTICAL_COLLECTION);
        assert_eq!(json["datetime"], "2023-01-01/2023-04-01");
        assert_eq!(json["limit"], 50);
        assert!(json.get("token").is_none());
    }

    #[test]
    fn test_item_properties_extraction() {
        let text = r#"{
            "type": "Feature",
            "id": "S1A_IW_GRDH",
            "properties": {
                "datetime": "2023-06-15T05:32:11Z",
                "eo:cloud_cover": 23.4,
                "sar:polarizations": ["VV", "VH"]
            },
            "assets": {}
        }"#;
        let item: Item = serde_json::from_str(text).unwrap();
        assert_eq!(item.cloud_cover(), Some(23.4));
        assert!(item.has_dual_polarization());
        assert_eq!(
            item.acquisition_date(),
            chrono::NaiveDate::from_ymd_opt(2023, 6, 15)
        );
    }

    #[test]
    fn test_single_polarization_rejected() {
        let text = r#"{
            "type": "Feature",
            "id": "x",
            "properties": { "datetime": null, "sar:polarizations": ["VV"] },
            "assets": {}
        }"#;
        let item: Item = serde_json::from_str(text).unwrap();
        assert!(!item.has_dual_polarization());
    }

    #[test]
    fn test_endpoint_normalization() {
        let client =
            StacClient::new("https://stac.example.com/v1/", StacClientOptions::default()).unwrap();
        assert_eq!(client.endpoint(), "https://stac.example.com/v1/search");

        let client = StacClient::new(
            "https://stac.example.com/v1/search",
            StacClientOptions::default(),
        )
        .unwrap();
        assert_eq!(client.endpoint(), "https://stac.example.com/v1/search");
    }

    #[test]
    fn test_next_link_lookup() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [],
            "links": [
                { "rel": "self", "href": "https://x/search" },
                { "rel": "next", "href": "https://x/search?page=2" }
            ]
        }"#;
        let page: ItemCollection = serde_json::from_str(text).unwrap();
        assert_eq!(page.next_link().unwrap().href, "https://x/search?page=2");
    }
}
