use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::normalization::title::CandidateGame;

/// ITAD's shop id for Steam.
pub const STEAM_SHOP_ID: u32 = 61;

pub const DEFAULT_BASE_URL: &str = "https://api.isthereanydeal.com";

pub(crate) fn truncate_for_log(mut s: String, max_len: usize) -> String {
    if s.len() > max_len {
        let mut cut = max_len;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
        s.push('…');
    }
    s
}

/// ITAD (IsThereAnyDeal) client for lookup, metadata and price history.
/// Public API (base): https://api.isthereanydeal.com/
///
/// Key endpoints:
/// - GET /games/search/v1?title=...&limit=... - Search for games
/// - GET /games/lookup/v1?appid=... - Map a Steam app id to an ITAD id
/// - GET /games/info/v2?id=... - Game details (appid, tags, reviews, urls)
/// - POST /games/prices/v3?country=..&shops=.. - Current deals + history lows, batched by id
#[derive(Debug, Clone)]
pub struct ItadProvider {
    base_url: String,
    http: Client,
    api_key: Option<String>,
}

/// One search hit, kept with its artwork so the gallery can reuse it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItadSearchHit {
    pub candidate: CandidateGame,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItadGameInfo {
    pub id: String,
    pub title: Option<String>,
    pub app_id: Option<u64>,
    pub tags: Vec<String>,
    pub release_date: Option<NaiveDate>,
    pub developers: Vec<String>,
    /// Steam review score (percent positive) as reported by ITAD.
    pub steam_review: Option<i64>,
    pub itad_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItadDeal {
    pub game_id: String,
    pub store_id: String,
    pub store_name: String,
    pub price: Option<f64>,
    pub regular_price: Option<f64>,
    pub discount: i32,
    pub currency: Option<String>,
}

impl ItadDeal {
    pub fn is_steam(&self) -> bool {
        self.store_name.eq_ignore_ascii_case("steam") || self.store_id == STEAM_SHOP_ID.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItadAmount {
    pub amount: f64,
    pub currency: Option<String>,
}

/// History-low buckets: last 3 months, last year, all time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItadHistoryLow {
    pub m3: Option<ItadAmount>,
    pub y1: Option<ItadAmount>,
    pub all: Option<ItadAmount>,
}

impl ItadHistoryLow {
    /// First populated bucket in 3-month, 1-year, all-time order.
    pub fn best(&self) -> Option<&ItadAmount> {
        self.m3.as_ref().or(self.y1.as_ref()).or(self.all.as_ref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItadGamePrices {
    pub game_id: String,
    pub deals: Vec<ItadDeal>,
    pub history_low: ItadHistoryLow,
}

impl ItadGamePrices {
    pub fn steam_deal(&self) -> Option<&ItadDeal> {
        self.deals.iter().find(|d| d.is_steam())
    }
}

impl ItadProvider {
    pub fn new(base_url: Option<&str>, timeout_secs: Option<u64>) -> Result<Self> {
        let base_url = base_url
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        let timeout_secs = timeout_secs.unwrap_or(20);
        let http = Client::builder()
            .user_agent("steam-lowest/0.1")
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            base_url,
            http,
            api_key: None,
        })
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|s| !s.trim().is_empty());
        self
    }

    fn add_auth_query(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key.as_deref() {
            Some(key) => req.query(&[("key", key)]),
            None => req,
        }
    }

    fn value_as_f64(v: &Value) -> Option<f64> {
        if let Some(n) = v.as_f64() {
            return Some(n);
        }
        if let Some(n) = v.as_i64() {
            return Some(n as f64);
        }
        if let Some(s) = v.as_str() {
            return s.parse::<f64>().ok();
        }
        None
    }

    fn value_as_string(v: &Value) -> Option<String> {
        match v {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn extract_asset_url(obj: &Value, key: &str) -> Option<String> {
        obj.get("assets")
            .and_then(|a| a.get(key))
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.to_string())
    }

    /// `urls` shows up both as a list and as a `{name: url}` object.
    fn extract_urls(obj: &Value) -> Vec<String> {
        match obj.get("urls") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect(),
            Some(Value::Object(map)) => map
                .values()
                .filter_map(|v| v.as_str())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    fn parse_amount(v: Option<&Value>) -> Option<ItadAmount> {
        let v = v?;
        let amount = v.get("amount").and_then(Self::value_as_f64)?;
        Some(ItadAmount {
            amount,
            currency: v
                .get("currency")
                .and_then(|c| c.as_str())
                .map(str::to_string),
        })
    }

    async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let req = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .query(query);
        let resp = self.add_auth_query(req).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = truncate_for_log(resp.text().await.unwrap_or_default(), 2000);
            return Err(anyhow!("ITAD request failed: {status} url={url} body={body}"));
        }
        resp.json::<Value>()
            .await
            .with_context(|| format!("ITAD response was not JSON: url={url}"))
    }

    /// Search for a game by title; results keep the upstream order.
    pub async fn search_game(&self, query: &str, limit: u32) -> Result<Vec<ItadSearchHit>> {
        let body = self
            .get_json(
                "/games/search/v1",
                &[("title", query.to_string()), ("limit", limit.to_string())],
            )
            .await?;

        let Some(results) = body.as_array() else {
            return Err(anyhow!(
                "Unexpected ITAD search response shape (expected array)"
            ));
        };

        let mut hits = Vec::with_capacity(results.len());
        for item in results {
            let Some(id) = item.get("id").and_then(Self::value_as_string) else {
                continue;
            };
            let title = item
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let thumbnail_url = ["banner145", "boxart", "banner300", "banner400", "banner600"]
                .iter()
                .find_map(|key| Self::extract_asset_url(item, key));
            hits.push(ItadSearchHit {
                candidate: CandidateGame {
                    id,
                    title,
                    kind: item
                        .get("type")
                        .and_then(|v| v.as_str())
                        .map(str::to_string),
                    urls: Self::extract_urls(item),
                },
                thumbnail_url,
            });
        }

        Ok(hits)
    }

    /// Map a Steam app id to the ITAD game id; `None` when ITAD reports no match.
    pub async fn lookup_app_id(&self, app_id: u64) -> Result<Option<String>> {
        let body = self
            .get_json("/games/lookup/v1", &[("appid", app_id.to_string())])
            .await?;

        if !body.get("found").and_then(|v| v.as_bool()).unwrap_or(false) {
            return Ok(None);
        }
        Ok(body
            .get("game")
            .and_then(|g| g.get("id"))
            .and_then(Self::value_as_string))
    }

    /// Canonical game info for an ITAD id.
    pub async fn game_info(&self, game_id: &str) -> Result<ItadGameInfo> {
        let body = self
            .get_json("/games/info/v2", &[("id", game_id.to_string())])
            .await?;

        // /games/info/v2 returns a single object (not wrapped in {data: ...}).
        if !body.is_object() {
            return Err(anyhow!(
                "Unexpected ITAD game info response shape (expected object)"
            ));
        }

        let app_id = body.get("appid").and_then(|v| {
            v.as_u64()
                .or_else(|| v.as_str().and_then(|s| s.parse::<u64>().ok()))
        });

        let tags = body
            .get("tags")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|t| t.as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let developers = body
            .get("developers")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|d| d.get("name").and_then(|n| n.as_str()))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let release_date = body
            .get("releaseDate")
            .and_then(|v| v.as_str())
            .and_then(|s| NaiveDate::parse_from_str(s.get(..10).unwrap_or(s), "%Y-%m-%d").ok());

        let steam_review = body
            .get("reviews")
            .and_then(|v| v.as_array())
            .and_then(|arr| {
                arr.iter()
                    .find(|r| r.get("source").and_then(|s| s.as_str()) == Some("Steam"))
            })
            .and_then(|r| r.get("score"))
            .and_then(Self::value_as_f64)
            .map(|s| s.round() as i64);

        Ok(ItadGameInfo {
            id: game_id.to_string(),
            title: body
                .get("title")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            app_id,
            tags,
            release_date,
            developers,
            steam_review,
            itad_url: body
                .get("urls")
                .and_then(|u| u.get("game"))
                .and_then(|v| v.as_str())
                .map(str::to_string),
        })
    }

    /// Current deals and history lows for a batch of ids, scoped to one country and shop list.
    pub async fn prices(
        &self,
        game_ids: &[String],
        country: &str,
        shops: &[u32],
    ) -> Result<Vec<ItadGamePrices>> {
        let url = format!("{}/games/prices/v3", self.base_url);
        let shops = shops
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let req = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .query(&[("country", country), ("shops", shops.as_str())])
            .json(game_ids);
        let resp = self.add_auth_query(req).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = truncate_for_log(resp.text().await.unwrap_or_default(), 2000);
            return Err(anyhow!(
                "ITAD prices failed: {status} url={url} country={country} body={body}"
            ));
        }

        let body: Value = resp.json().await?;
        let Some(entries) = body.as_array() else {
            return Err(anyhow!(
                "Unexpected ITAD prices response shape (expected array)"
            ));
        };

        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(game_id) = entry.get("id").and_then(Self::value_as_string) else {
                continue;
            };

            let history = entry.get("historyLow");
            let history_low = ItadHistoryLow {
                m3: Self::parse_amount(history.and_then(|h| h.get("m3"))),
                y1: Self::parse_amount(history.and_then(|h| h.get("y1"))),
                all: Self::parse_amount(history.and_then(|h| h.get("all"))),
            };

            let mut deals = Vec::new();
            for deal_obj in entry
                .get("deals")
                .and_then(|v| v.as_array())
                .map(Vec::as_slice)
                .unwrap_or_default()
            {
                let shop_obj = deal_obj.get("shop");
                let price = Self::parse_amount(deal_obj.get("price"));
                let regular = Self::parse_amount(deal_obj.get("regular"));
                deals.push(ItadDeal {
                    game_id: game_id.clone(),
                    store_id: shop_obj
                        .and_then(|s| s.get("id"))
                        .and_then(Self::value_as_string)
                        .unwrap_or_else(|| "unknown".to_string()),
                    store_name: shop_obj
                        .and_then(|s| s.get("name"))
                        .and_then(|v| v.as_str())
                        .unwrap_or("Unknown")
                        .to_string(),
                    currency: price.as_ref().and_then(|p| p.currency.clone()),
                    price: price.map(|p| p.amount),
                    regular_price: regular.map(|r| r.amount),
                    discount: deal_obj
                        .get("cut")
                        .and_then(|v| v.as_i64())
                        .map(|v| v as i32)
                        .unwrap_or(0)
                        .max(0),
                });
            }

            out.push(ItadGamePrices {
                game_id,
                deals,
                history_low,
            });
        }

        Ok(out)
    }
}
