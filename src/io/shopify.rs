//! Shopify Admin REST client
//!
//! Implements `InventoryService` on top of four Admin API endpoints:
//! - `GET  locations.json`
//! - `GET  variants.json?barcode=`
//! - `GET  inventory_levels.json?inventory_item_ids=&location_ids=`
//! - `POST inventory_levels/set.json`
//!
//! Every request carries the store access token. Lookups that fail at the
//! transport level or answer with a non-success status are `ServiceError`s;
//! a write answered with anything but 200 is a `SetOutcome::Rejected`.

use crate::domain::types::{
    Barcode, InventoryItemId, InventoryLevel, Location, LocationId, SetOutcome, Variant,
};
use crate::infra::config::Config;
use crate::services::inventory::{InventoryService, ServiceError};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error};

const ACCESS_TOKEN_HEADER: &str = "x-shopify-access-token";
/// Longest response body excerpt kept in a rejected write
const MAX_REASON_LEN: usize = 200;

#[derive(Debug, Deserialize)]
struct LocationsEnvelope {
    #[serde(default)]
    locations: Vec<Location>,
}

#[derive(Debug, Deserialize)]
struct VariantsEnvelope {
    #[serde(default)]
    variants: Vec<Variant>,
}

#[derive(Debug, Deserialize)]
struct InventoryLevelsEnvelope {
    #[serde(default)]
    inventory_levels: Vec<InventoryLevel>,
}

#[derive(Debug, Deserialize)]
struct InventoryLevelEnvelope {
    inventory_level: InventoryLevel,
}

#[derive(Debug, Serialize)]
struct SetLevelRequest {
    location_id: LocationId,
    inventory_item_id: InventoryItemId,
    available: i64,
}

pub struct ShopifyClient {
    http: reqwest::Client,
    base_url: String,
}

impl ShopifyClient {
    /// Build the client from process configuration.
    ///
    /// Fails when no access token is configured.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let token = config.access_token().context(
            "no store access token configured (set SHOPIFY_ACCESS_TOKEN or store.access_token)",
        )?;

        let mut token_value = HeaderValue::from_str(token)
            .context("store access token is not a valid header value")?;
        token_value.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(ACCESS_TOKEN_HEADER, token_value);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(config.store_timeout_ms()))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self { http, base_url: config.store_api_base() })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        query: &[(&str, String)],
    ) -> Result<T, ServiceError> {
        let start = Instant::now();
        let response = self
            .http
            .get(self.url(endpoint))
            .query(query)
            .send()
            .await
            .map_err(|source| ServiceError::Http { endpoint, source })?;

        let status = response.status();
        debug!(
            endpoint = endpoint,
            status = status.as_u16(),
            latency_us = start.elapsed().as_micros() as u64,
            "store_request"
        );
        if !status.is_success() {
            return Err(ServiceError::Status { endpoint, status: status.as_u16() });
        }

        let body =
            response.bytes().await.map_err(|source| ServiceError::Http { endpoint, source })?;
        serde_json::from_slice(&body)
            .map_err(|e| ServiceError::Decode { endpoint, reason: e.to_string() })
    }
}

#[async_trait]
impl InventoryService for ShopifyClient {
    async fn list_locations(&self) -> Result<Vec<Location>, ServiceError> {
        let envelope: LocationsEnvelope = self.get_json("locations.json", &[]).await?;
        Ok(envelope.locations)
    }

    async fn find_variants_by_barcode(
        &self,
        barcode: &Barcode,
    ) -> Result<Vec<Variant>, ServiceError> {
        let envelope: VariantsEnvelope =
            self.get_json("variants.json", &[("barcode", barcode.to_string())]).await?;
        Ok(envelope.variants)
    }

    async fn read_available(
        &self,
        item: InventoryItemId,
        location: LocationId,
    ) -> Result<Vec<InventoryLevel>, ServiceError> {
        let envelope: InventoryLevelsEnvelope = self
            .get_json(
                "inventory_levels.json",
                &[("inventory_item_ids", item.to_string()), ("location_ids", location.to_string())],
            )
            .await?;
        Ok(envelope.inventory_levels)
    }

    async fn set_available(
        &self,
        item: InventoryItemId,
        location: LocationId,
        available: i64,
    ) -> Result<SetOutcome, ServiceError> {
        const ENDPOINT: &str = "inventory_levels/set.json";

        let start = Instant::now();
        let request = SetLevelRequest { location_id: location, inventory_item_id: item, available };
        let response = self
            .http
            .post(self.url(ENDPOINT))
            .json(&request)
            .send()
            .await
            .map_err(|source| ServiceError::Http { endpoint: ENDPOINT, source })?;

        let status = response.status();
        debug!(
            endpoint = ENDPOINT,
            status = status.as_u16(),
            latency_us = start.elapsed().as_micros() as u64,
            "store_request"
        );

        // A body read failure after the status line is still a transport fault
        let body = response
            .bytes()
            .await
            .map_err(|source| ServiceError::Http { endpoint: ENDPOINT, source })?;

        Ok(write_outcome(status, &body, available))
    }
}

fn write_outcome(status: StatusCode, body: &[u8], requested: i64) -> SetOutcome {
    if status != StatusCode::OK {
        return SetOutcome::Rejected { status: status.as_u16(), reason: reason_excerpt(body) };
    }

    match serde_json::from_slice::<InventoryLevelEnvelope>(body) {
        Ok(envelope) => SetOutcome::Applied { available: envelope.inventory_level.available },
        Err(e) => {
            // Write went through; only the echo is unreadable
            error!(error = %e, "store_set_response_undecodable");
            SetOutcome::Applied { available: requested }
        }
    }
}

fn reason_excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    match text.char_indices().nth(MAX_REASON_LEN) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
