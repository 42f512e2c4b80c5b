//! Price-source fetches.
//!
//! Every function here is bounded by a timeout and swallows its own failures:
//! transport errors, non-2xx answers and malformed payloads come back as
//! absent values so sibling fetches are never aborted.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use anyhow::anyhow;
use tracing::{debug, info, warn};

use super::model::{GameMetadata, HistoryLowFact, HomeListing, RegionPriceFact};
use super::RequestContext;
use crate::config::{CompareRegion, COMPARE_LOCALE, HOME_LOCALE, HOME_REGION};
use crate::providers::itad::{ItadGamePrices, STEAM_SHOP_ID};
use crate::providers::steam::{capsule_variant, AppData};

/// Run `fut` under `limit`; a timeout becomes an ordinary error.
pub(crate) async fn within<T, F>(limit: Duration, fut: F) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| anyhow!("timed out after {}s", limit.as_secs()))?
}

fn region_fact(data: &AppData) -> RegionPriceFact {
    let Some(po) = data.price_overview.as_ref() else {
        return RegionPriceFact::absent();
    };
    // Without both amount and currency the snapshot is useless.
    let (Some(price), Some(currency)) = (po.final_amount(), po.currency.clone()) else {
        return RegionPriceFact::absent();
    };
    RegionPriceFact {
        price: Some(price),
        currency: Some(currency),
        discount_percent: po.discount_percent.unwrap_or(0).max(0),
        regular_price: po.initial_amount(),
    }
}

/// Storefront price for any region; absent on any failure.
pub async fn fetch_storefront_price(
    ctx: &RequestContext<'_>,
    app_id: u64,
    region: &str,
    locale: &str,
) -> RegionPriceFact {
    let bot = ctx.bot;
    match within(
        bot.config.fetch_timeout,
        bot.steam.app_details(app_id, region, locale),
    )
    .await
    {
        Ok(Some(data)) => {
            let fact = region_fact(&data);
            if fact.has_price() {
                info!(appid = app_id, region, price = ?fact.price, currency = ?fact.currency, "steam: live price");
            } else {
                info!(appid = app_id, region, "steam: listing has no price");
            }
            fact
        }
        Ok(None) => {
            info!(appid = app_id, region, "steam: no listing in region");
            RegionPriceFact::absent()
        }
        Err(err) => {
            warn!(appid = app_id, region, %err, "steam: price fetch failed; treating as absent");
            RegionPriceFact::absent()
        }
    }
}

/// Home-locale listing: display name, thumbnail (small capsule when it exists) and live price.
pub async fn fetch_home_listing(ctx: &RequestContext<'_>, app_id: u64) -> HomeListing {
    let bot = ctx.bot;
    let data = match within(
        bot.config.fetch_timeout,
        bot.steam.app_details(app_id, HOME_REGION, HOME_LOCALE),
    )
    .await
    {
        Ok(Some(data)) => data,
        Ok(None) => {
            info!(appid = app_id, "steam: no home listing");
            return HomeListing::default();
        }
        Err(err) => {
            warn!(appid = app_id, %err, "steam: home listing failed; treating as absent");
            return HomeListing::default();
        }
    };

    let thumbnail_url = match data.header_image.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(header) => Some(pick_thumbnail(ctx, header).await),
        None => None,
    };

    HomeListing {
        display_name: data.name.clone().filter(|n| !n.trim().is_empty()),
        thumbnail_url,
        live: region_fact(&data),
    }
}

async fn pick_thumbnail(ctx: &RequestContext<'_>, header: &str) -> String {
    let Some(small) = capsule_variant(header) else {
        return header.to_string();
    };
    let probe = within(ctx.bot.config.fetch_timeout, ctx.bot.steam.image_available(&small)).await;
    match probe {
        Ok(true) => small,
        Ok(false) => header.to_string(),
        Err(err) => {
            debug!(%err, "steam: capsule probe failed; using header image");
            header.to_string()
        }
    }
}

/// Comparison-region price. Disabled comparison issues no request at all.
pub async fn fetch_comparison_price(
    ctx: &RequestContext<'_>,
    app_id: u64,
    region: &CompareRegion,
) -> RegionPriceFact {
    match region.code() {
        Some(code) => fetch_storefront_price(ctx, app_id, code, COMPARE_LOCALE).await,
        None => RegionPriceFact::absent(),
    }
}

/// Aggregator id for a store app id; `None` when not found or on failure.
pub async fn fetch_aggregator_id(ctx: &RequestContext<'_>, app_id: u64) -> Option<String> {
    let bot = ctx.bot;
    match within(bot.config.fetch_timeout, bot.itad.lookup_app_id(app_id)).await {
        Ok(Some(gid)) => {
            info!(appid = app_id, gid = %gid, "itad: lookup resolved");
            Some(gid)
        }
        Ok(None) => {
            info!(appid = app_id, "itad: lookup found no game");
            None
        }
        Err(err) => {
            warn!(appid = app_id, %err, "itad: lookup failed; treating as not found");
            None
        }
    }
}

/// Aggregator metadata; empty on failure.
pub async fn fetch_aggregator_metadata(ctx: &RequestContext<'_>, gid: &str) -> GameMetadata {
    let bot = ctx.bot;
    match within(bot.config.fetch_timeout, bot.itad.game_info(gid)).await {
        Ok(info) => GameMetadata {
            title: info.title,
            tags: info.tags,
            release_date: info.release_date,
            developers: info.developers,
            review_score: info.steam_review,
            aggregator_url: info.itad_url,
        },
        Err(err) => {
            warn!(gid, %err, "itad: info failed; metadata absent");
            GameMetadata::default()
        }
    }
}

/// Store app id from the aggregator's info record, bounded by the resolver's own timeout.
pub async fn fetch_store_app_id(ctx: &RequestContext<'_>, gid: &str) -> Option<u64> {
    let bot = ctx.bot;
    match within(bot.config.resolve_lookup_timeout, bot.itad.game_info(gid)).await {
        Ok(info) => info.app_id,
        Err(err) => {
            warn!(gid, %err, "itad: appid lookup via info failed");
            None
        }
    }
}

fn steam_facts(entry: &ItadGamePrices) -> (RegionPriceFact, HistoryLowFact) {
    let current = entry
        .steam_deal()
        .map(|deal| RegionPriceFact {
            price: deal.price,
            currency: deal.currency.clone(),
            discount_percent: i64::from(deal.discount),
            regular_price: deal.regular_price,
        })
        .unwrap_or_default();
    let history = entry
        .history_low
        .best()
        .map(|low| HistoryLowFact {
            amount: Some(low.amount),
            currency: low.currency.clone(),
        })
        .unwrap_or_default();
    (current, history)
}

/// Steam-seller current price and history low from the aggregator, for one country.
pub async fn fetch_aggregator_prices(
    ctx: &RequestContext<'_>,
    gid: &str,
    country: &str,
) -> (RegionPriceFact, HistoryLowFact) {
    let bot = ctx.bot;
    let ids = [gid.to_string()];
    match within(
        bot.config.fetch_timeout,
        bot.itad.prices(&ids, country, &[STEAM_SHOP_ID]),
    )
    .await
    {
        Ok(entries) => match entries.iter().find(|e| e.game_id == gid) {
            Some(entry) => {
                let facts = steam_facts(entry);
                info!(gid, country, price = ?facts.0.price, low = ?facts.1.amount, "itad: prices fetched");
                facts
            }
            None => {
                info!(gid, country, "itad: prices response had no entry for id");
                Default::default()
            }
        },
        Err(err) => {
            warn!(gid, country, %err, "itad: prices failed; treating as absent");
            Default::default()
        }
    }
}

/// Steam-seller home-region prices for many ids in one batch call; empty on failure.
pub async fn fetch_batch_home_prices(
    ctx: &RequestContext<'_>,
    gids: &[String],
) -> HashMap<String, RegionPriceFact> {
    if gids.is_empty() {
        return HashMap::new();
    }
    let bot = ctx.bot;
    match within(
        bot.config.fetch_timeout,
        bot.itad.prices(gids, HOME_REGION, &[STEAM_SHOP_ID]),
    )
    .await
    {
        Ok(entries) => entries
            .iter()
            .map(|e| (e.game_id.clone(), steam_facts(e).0))
            .collect(),
        Err(err) => {
            warn!(count = gids.len(), %err, "itad: batch prices failed; prices left blank");
            HashMap::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::test_support::test_bot;
    use crate::reply::ReplySink;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn disabled_comparison_issues_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/appdetails"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(0)
            .mount(&server)
            .await;

        let bot = test_bot(&server, CompareRegion::Disabled);
        let (sink, _rx) = ReplySink::channel();
        let ctx = RequestContext::new(&bot, &sink);
        let fact = fetch_comparison_price(&ctx, 570, &CompareRegion::Disabled).await;
        assert_eq!(fact, RegionPriceFact::absent());
    }

    #[tokio::test]
    async fn server_errors_and_garbage_degrade_to_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/appdetails"))
            .and(query_param("cc", "ua"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/games/lookup/v1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let bot = test_bot(&server, CompareRegion::parse("UA"));
        let (sink, _rx) = ReplySink::channel();
        let ctx = RequestContext::new(&bot, &sink);
        let fact = fetch_comparison_price(&ctx, 570, &CompareRegion::parse("UA")).await;
        assert!(!fact.has_price());
        assert_eq!(fetch_aggregator_id(&ctx, 570).await, None);
    }

    #[tokio::test]
    async fn slow_upstream_is_cut_off_by_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/games/prices/v3"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([]))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let bot = test_bot(&server, CompareRegion::Disabled);
        let (sink, _rx) = ReplySink::channel();
        let ctx = RequestContext::new(&bot, &sink);
        let started = std::time::Instant::now();
        let (current, low) = fetch_aggregator_prices(&ctx, "gid", "CN").await;
        assert!(started.elapsed() < Duration::from_secs(3));
        assert_eq!(current, RegionPriceFact::absent());
        assert_eq!(low, HistoryLowFact::default());
    }

    #[tokio::test]
    async fn home_listing_falls_back_to_header_image() {
        let server = MockServer::start().await;
        let header = format!("{}/img/570/header.jpg", server.uri());
        Mock::given(method("GET"))
            .and(path("/api/appdetails"))
            .and(query_param("cc", "cn"))
            .and(query_param("l", "schinese"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "570": {"success": true, "data": {"name": "刀塔2", "header_image": header}}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/img/570/capsule_184x69.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let bot = test_bot(&server, CompareRegion::Disabled);
        let (sink, _rx) = ReplySink::channel();
        let ctx = RequestContext::new(&bot, &sink);
        let listing = fetch_home_listing(&ctx, 570).await;
        assert_eq!(listing.display_name.as_deref(), Some("刀塔2"));
        assert_eq!(listing.thumbnail_url, Some(header));
        assert!(!listing.live.has_price());
    }

    #[tokio::test]
    async fn home_listing_keeps_capsule_when_it_exists() {
        let server = MockServer::start().await;
        let header = format!("{}/img/620/header.jpg", server.uri());
        Mock::given(method("GET"))
            .and(path("/api/appdetails"))
            .and(query_param("appids", "620"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "620": {"success": true, "data": {
                    "name": "传送门 2",
                    "header_image": header,
                    "price_overview": {"final": 3700, "initial": 3700, "currency": "CNY", "discount_percent": 0}
                }}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/img/620/capsule_184x69.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xFFu8, 0xD8]))
            .expect(1)
            .mount(&server)
            .await;

        let bot = test_bot(&server, CompareRegion::Disabled);
        let (sink, _rx) = ReplySink::channel();
        let ctx = RequestContext::new(&bot, &sink);
        let listing = fetch_home_listing(&ctx, 620).await;
        let thumb = listing.thumbnail_url.unwrap();
        assert!(thumb.ends_with("/img/620/capsule_184x69.jpg"), "{thumb}");
        assert_eq!(listing.live.price, Some(37.0));
        assert_eq!(listing.live.discount_percent, 0);
    }
}
