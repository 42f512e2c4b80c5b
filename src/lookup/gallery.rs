//! Gallery search: up to ten aggregator hits with thumbnails and home prices.

use futures::future::join_all;
use tracing::{error, info, warn};

use super::model::RegionPriceFact;
use super::resolver::english_title;
use super::sources::{self, within};
use super::RequestContext;
use crate::error::GalleryError;
use crate::providers::itad::ItadSearchHit;
use crate::providers::thumbnail::Thumbnail;
use crate::reply::{Reply, Segment};

pub const GALLERY_SEARCH_LIMIT: u32 = 8;
pub const GALLERY_MAX_ENTRIES: usize = 10;

fn gallery_price(fact: Option<&RegionPriceFact>) -> Option<String> {
    let fact = fact?;
    let price = fact.price?;
    Some(match fact.currency.as_deref() {
        Some("CNY") => format!("￥{price:.2}"),
        Some(code) => format!("{code} {price:.2}"),
        None => return None,
    })
}

async fn thumbnail(ctx: &RequestContext<'_>, hit: &ItadSearchHit) -> Option<Thumbnail> {
    let url = hit.thumbnail_url.as_deref()?;
    match within(
        ctx.bot.config.gallery_timeout,
        ctx.bot.thumbnailer.fetch_thumbnail(url),
    )
    .await
    {
        Ok(thumb) => Some(thumb),
        Err(err) => {
            warn!(gid = %hit.candidate.id, %err, "gallery: thumbnail unavailable");
            None
        }
    }
}

/// Run the gallery search and build its single reply.
pub async fn gallery(ctx: &RequestContext<'_>, name: &str) -> Result<Reply, GalleryError> {
    let title = english_title(ctx, name.trim())
        .await
        .map_err(|_| GalleryError::TranslationFailed)?;
    ctx.notice(format!("正在为主人查找游戏《{title}》，请稍等..."));

    let mut hits = within(
        ctx.bot.config.fetch_timeout,
        ctx.bot.itad.search_game(&title, GALLERY_SEARCH_LIMIT),
    )
    .await
    .map_err(|err| {
        error!(title = %title, %err, "gallery: search failed");
        GalleryError::SearchFailed
    })?;
    if hits.is_empty() {
        return Err(GalleryError::NothingFound);
    }
    hits.truncate(GALLERY_MAX_ENTRIES);

    let ids: Vec<String> = hits.iter().map(|h| h.candidate.id.clone()).collect();
    let (prices, thumbs) = tokio::join!(
        sources::fetch_batch_home_prices(ctx, &ids),
        join_all(hits.iter().map(|h| thumbnail(ctx, h))),
    );
    info!(
        count = hits.len(),
        priced = prices.len(),
        thumbs = thumbs.iter().flatten().count(),
        "gallery: entries assembled"
    );

    let mut segments = Vec::with_capacity(hits.len() * 2);
    for (hit, thumb) in hits.iter().zip(thumbs) {
        if let Some(thumb) = thumb {
            segments.push(Segment::ImageBase64 {
                content_type: thumb.content_type,
                data: thumb.base64,
            });
        }
        let line = match gallery_price(prices.get(&hit.candidate.id)) {
            Some(price) => format!("{}  {}", hit.candidate.title, price),
            None => hit.candidate.title.clone(),
        };
        segments.push(Segment::Text(line));
    }
    Ok(Reply { segments })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::test_support::test_bot;
    use crate::config::CompareRegion;
    use crate::providers::thumbnail::Thumbnailer;
    use crate::reply::ReplySink;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct OnlyBoxart;

    #[async_trait]
    impl Thumbnailer for OnlyBoxart {
        async fn fetch_thumbnail(&self, url: &str) -> anyhow::Result<Thumbnail> {
            if url.ends_with("boxart.jpg") {
                Ok(Thumbnail {
                    content_type: Some("image/jpeg".into()),
                    base64: "AAAA".into(),
                })
            } else {
                Err(anyhow!("unreachable image"))
            }
        }
    }

    #[test]
    fn price_format_by_currency() {
        let cny = RegionPriceFact {
            price: Some(9.5),
            currency: Some("CNY".into()),
            ..Default::default()
        };
        let usd = RegionPriceFact {
            price: Some(4.99),
            currency: Some("USD".into()),
            ..Default::default()
        };
        assert_eq!(gallery_price(Some(&cny)).as_deref(), Some("￥9.50"));
        assert_eq!(gallery_price(Some(&usd)).as_deref(), Some("USD 4.99"));
        assert_eq!(gallery_price(Some(&RegionPriceFact::absent())), None);
        assert_eq!(gallery_price(None), None);
    }

    #[tokio::test]
    async fn one_batch_price_call_and_optional_thumbnails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/games/search/v1"))
            .and(query_param("title", "Portal"))
            .and(query_param("limit", "8"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "p1", "title": "Portal", "type": "game",
                 "assets": {"boxart": "https://img/p1/boxart.jpg"}},
                {"id": "p2", "title": "Portal 2", "type": "game",
                 "assets": {"banner145": "https://img/p2/banner145.jpg"}}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/games/prices/v3"))
            .and(query_param("country", "CN"))
            .and(query_param("shops", "61"))
            .and(body_json(json!(["p1", "p2"])))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "id": "p1",
                "deals": [{"shop": {"id": 61, "name": "Steam"},
                           "price": {"amount": 9.5, "currency": "CNY"},
                           "regular": {"amount": 38.0, "currency": "CNY"},
                           "cut": 75}]
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let bot = test_bot(&server, CompareRegion::Disabled).with_thumbnailer(Arc::new(OnlyBoxart));
        let (sink, mut rx) = ReplySink::channel();
        let ctx = RequestContext::new(&bot, &sink);
        let reply = gallery(&ctx, "Portal").await.unwrap();

        assert!(rx.try_recv().unwrap().plain_text().contains("《Portal》"));
        assert_eq!(
            reply.segments,
            vec![
                Segment::ImageBase64 {
                    content_type: Some("image/jpeg".into()),
                    data: "AAAA".into()
                },
                Segment::Text("Portal  ￥9.50".into()),
                Segment::Text("Portal 2".into()),
            ]
        );
    }

    #[tokio::test]
    async fn empty_search_and_failures_map_to_gallery_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/games/search/v1"))
            .and(query_param("title", "zzz"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/games/search/v1"))
            .and(query_param("title", "boom"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let bot = test_bot(&server, CompareRegion::Disabled);
        let (sink, _rx) = ReplySink::channel();
        let ctx = RequestContext::new(&bot, &sink);
        assert_eq!(gallery(&ctx, "zzz").await.unwrap_err(), GalleryError::NothingFound);
        assert_eq!(gallery(&ctx, "boom").await.unwrap_err(), GalleryError::SearchFailed);
        assert_eq!(
            gallery(&ctx, "传送门").await.unwrap_err(),
            GalleryError::TranslationFailed
        );
    }
}
