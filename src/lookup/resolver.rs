//! Game resolver: user query -> store app id -> canonical id pair.

use tracing::{error, info, warn};

use super::model::CanonicalGameId;
use super::sources::{self, within};
use super::RequestContext;
use crate::error::LookupError;
use crate::normalization::title::{needs_translation, pick_best, CandidateGame, GameQuery};

/// Aggregator search width for the lookup command.
pub const SEARCH_LIMIT: u32 = 5;

/// English storefront-style title for free text; CJK input goes through the translator.
pub async fn english_title(ctx: &RequestContext<'_>, text: &str) -> Result<String, LookupError> {
    if !needs_translation(text) {
        info!(title = text, "lookup: no CJK in query; using it verbatim");
        return Ok(text.to_string());
    }
    match ctx.bot.translator.translate_title(text).await {
        Ok(title) if !title.trim().is_empty() => {
            info!(input = text, title = %title, "lookup: title translated");
            Ok(title.trim().to_string())
        }
        Ok(_) => {
            error!(input = text, "lookup: translator returned an empty title");
            Err(LookupError::TranslationFailed)
        }
        Err(err) => {
            error!(input = text, %err, "lookup: title translation failed");
            Err(LookupError::TranslationFailed)
        }
    }
}

/// Resolve a query to a store app id.
///
/// Links skip translation and search entirely. Free text is searched on the
/// aggregator and matched; the aggregator id is resolved later by [`canonicalize`].
pub async fn resolve(ctx: &RequestContext<'_>, query: GameQuery) -> Result<u64, LookupError> {
    match query {
        GameQuery::DirectLink { store_id } => Ok(store_id),
        GameQuery::MalformedLink { raw } => {
            warn!(input = %raw, "lookup: link does not match the storefront pattern");
            Err(LookupError::InvalidLink)
        }
        GameQuery::FreeText { text } => resolve_title(ctx, &text).await,
    }
}

async fn resolve_title(ctx: &RequestContext<'_>, text: &str) -> Result<u64, LookupError> {
    if text.trim().is_empty() {
        return Err(LookupError::GameNotFound);
    }
    let title = english_title(ctx, text).await?;
    ctx.notice(format!("正在为主人搜索《{title}》，主人等一小会喵..."));

    let hits = within(
        ctx.bot.config.fetch_timeout,
        ctx.bot.itad.search_game(&title, SEARCH_LIMIT),
    )
    .await
    .map_err(|err| {
        error!(title = %title, %err, "itad: search failed");
        LookupError::SearchFailed
    })?;
    info!(title = %title, count = hits.len(), "itad: search candidates");

    let candidates: Vec<CandidateGame> = hits.into_iter().map(|h| h.candidate).collect();
    let best = pick_best(&title, &candidates).ok_or(LookupError::GameNotFound)?;

    let mut notice = String::from("为主人查询史低信息喵~稍等稍等...\n");
    if !best.suggestions.is_empty() {
        notice.push_str("猜你想搜：\n");
        notice.push_str(&best.suggestions.join("\n"));
    }
    ctx.notice(notice);
    info!(
        gid = %best.chosen.id,
        chosen = %best.chosen.title,
        kind = ?best.kind,
        "lookup: candidate chosen"
    );

    if let Some(app_id) = best.chosen.store_app_id() {
        return Ok(app_id);
    }
    sources::fetch_store_app_id(ctx, &best.chosen.id)
        .await
        .ok_or(LookupError::NoStoreLink)
}

/// Link-only canonicalization: attach the aggregator id to a store app id.
pub async fn canonicalize(
    ctx: &RequestContext<'_>,
    store_app_id: u64,
) -> Result<CanonicalGameId, LookupError> {
    let aggregator_id = sources::fetch_aggregator_id(ctx, store_app_id)
        .await
        .ok_or(LookupError::NoAggregatorId)?;
    Ok(CanonicalGameId {
        store_app_id,
        aggregator_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::test_support::{test_bot, FixedTranslator};
    use crate::config::CompareRegion;
    use crate::reply::ReplySink;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn direct_link_skips_search() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/games/search/v1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(0)
            .mount(&server)
            .await;

        let bot = test_bot(&server, CompareRegion::Disabled);
        let (sink, mut rx) = ReplySink::channel();
        let ctx = RequestContext::new(&bot, &sink);
        let id = resolve(&ctx, GameQuery::parse("https://store.steampowered.com/app/570"))
            .await
            .unwrap();
        assert_eq!(id, 570);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn malformed_link_is_rejected() {
        let server = MockServer::start().await;
        let bot = test_bot(&server, CompareRegion::Disabled);
        let (sink, _rx) = ReplySink::channel();
        let ctx = RequestContext::new(&bot, &sink);
        let err = resolve(&ctx, GameQuery::parse("https://example.com/app/1"))
            .await
            .unwrap_err();
        assert_eq!(err, LookupError::InvalidLink);
    }

    #[tokio::test]
    async fn untranslatable_text_fails_with_translation_error() {
        let server = MockServer::start().await;
        let bot = test_bot(&server, CompareRegion::Disabled);
        let (sink, _rx) = ReplySink::channel();
        let ctx = RequestContext::new(&bot, &sink);
        let err = resolve(&ctx, GameQuery::parse("空洞骑士")).await.unwrap_err();
        assert_eq!(err, LookupError::TranslationFailed);
    }

    #[tokio::test]
    async fn translated_title_falls_back_to_first_candidate_and_looks_up_appid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/games/search/v1"))
            .and(query_param("title", "Hollow Knight"))
            .and(query_param("limit", "5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "g-first", "title": "Team Cherry Collection", "type": "game"},
                {"id": "g-second", "title": "Silksong", "type": "game"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/games/info/v2"))
            .and(query_param("id", "g-first"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "g-first", "title": "Team Cherry Collection", "appid": 367520
            })))
            .mount(&server)
            .await;

        let bot = test_bot(&server, CompareRegion::Disabled)
            .with_translator(Arc::new(FixedTranslator("Hollow Knight".into())));
        let (sink, mut rx) = ReplySink::channel();
        let ctx = RequestContext::new(&bot, &sink);
        let id = resolve(&ctx, GameQuery::parse("空洞骑士")).await.unwrap();
        assert_eq!(id, 367520);

        let searching = rx.try_recv().unwrap().plain_text();
        assert!(searching.contains("《Hollow Knight》"), "{searching}");
        let suggestions = rx.try_recv().unwrap().plain_text();
        assert!(suggestions.contains("猜你想搜：\nSilksong"), "{suggestions}");
    }

    #[tokio::test]
    async fn empty_search_is_not_found_and_missing_appid_is_no_store_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/games/search/v1"))
            .and(query_param("title", "Nothing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/games/search/v1"))
            .and(query_param("title", "Orphan"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": "g-1", "title": "Orphan", "type": "game"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/games/info/v2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "g-1"})))
            .mount(&server)
            .await;

        let bot = test_bot(&server, CompareRegion::Disabled);
        let (sink, _rx) = ReplySink::channel();
        let ctx = RequestContext::new(&bot, &sink);
        assert_eq!(
            resolve(&ctx, GameQuery::parse("Nothing")).await.unwrap_err(),
            LookupError::GameNotFound
        );
        assert_eq!(
            resolve(&ctx, GameQuery::parse("Orphan")).await.unwrap_err(),
            LookupError::NoStoreLink
        );
    }

    #[tokio::test]
    async fn search_transport_failure_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/games/search/v1"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let bot = test_bot(&server, CompareRegion::Disabled);
        let (sink, _rx) = ReplySink::channel();
        let ctx = RequestContext::new(&bot, &sink);
        assert_eq!(
            resolve(&ctx, GameQuery::parse("Portal")).await.unwrap_err(),
            LookupError::SearchFailed
        );
    }
}
