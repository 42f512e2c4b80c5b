use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::providers::itad::provider::truncate_for_log;

pub const DEFAULT_BASE_URL: &str = "https://store.steampowered.com";

/// Steam storefront client for per-region `appdetails` listings.
#[derive(Debug, Clone)]
pub struct SteamStoreClient {
    base_url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct AppDetailsWrapper {
    #[serde(default)]
    success: bool,
    data: Option<AppData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppData {
    pub name: Option<String>,
    pub header_image: Option<String>,
    pub price_overview: Option<PriceOverview>,
}

/// Prices are in minor units (cents / fen).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PriceOverview {
    #[serde(rename = "final")]
    pub final_price: Option<i64>,
    #[serde(rename = "initial")]
    pub initial_price: Option<i64>,
    pub currency: Option<String>,
    #[serde(default)]
    pub discount_percent: Option<i64>,
}

impl PriceOverview {
    pub fn final_amount(&self) -> Option<f64> {
        self.final_price.map(|p| p as f64 / 100.0)
    }

    pub fn initial_amount(&self) -> Option<f64> {
        self.initial_price.map(|p| p as f64 / 100.0)
    }
}

impl SteamStoreClient {
    pub fn new(base_url: Option<&str>, timeout_secs: Option<u64>) -> Result<Self> {
        let base_url = base_url
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        let http = Client::builder()
            .user_agent("steam-lowest/0.1")
            .timeout(Duration::from_secs(timeout_secs.unwrap_or(20)))
            .build()?;
        Ok(Self { base_url, http })
    }

    /// Listing for one app in one region.
    ///
    /// `Ok(None)` when the storefront answers `success: false` (delisted or region-locked).
    pub async fn app_details(&self, app_id: u64, cc: &str, lang: &str) -> Result<Option<AppData>> {
        let url = format!("{}/api/appdetails", self.base_url);
        let app_key = app_id.to_string();
        let cc_lower = cc.to_ascii_lowercase();
        let resp = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .query(&[
                ("appids", app_key.as_str()),
                ("cc", cc_lower.as_str()),
                ("l", lang),
            ])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = truncate_for_log(resp.text().await.unwrap_or_default(), 500);
            return Err(anyhow!(
                "steam appdetails failed: {status} appid={app_id} cc={cc} body={body}"
            ));
        }

        let mut body: Value = resp
            .json()
            .await
            .with_context(|| format!("steam appdetails not JSON: appid={app_id} cc={cc}"))?;
        let Some(entry) = body.get_mut(&app_key).map(Value::take) else {
            return Ok(None);
        };
        let wrapper: AppDetailsWrapper = serde_json::from_value(entry)
            .with_context(|| format!("steam appdetails malformed: appid={app_id} cc={cc}"))?;
        if !wrapper.success {
            return Ok(None);
        }
        Ok(wrapper.data)
    }

    /// Whether an image URL currently answers with a success status.
    pub async fn image_available(&self, url: &str) -> Result<bool> {
        let resp = self.http.get(url).send().await?;
        Ok(resp.status().is_success())
    }
}

/// Smaller capsule variant of a storefront header image, if the URL follows the usual naming.
pub fn capsule_variant(header_image: &str) -> Option<String> {
    header_image
        .contains("header.jpg")
        .then(|| header_image.replacen("header.jpg", "capsule_184x69.jpg", 1))
}
