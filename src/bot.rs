//! Command entry points shared by every host.

use std::sync::Arc;

use anyhow::Result;
use tracing::{info, info_span, warn, Instrument};

use crate::config::BotConfig;
use crate::lookup::{aggregate, gallery, render, resolver, AggregatedResult, RequestContext};
use crate::normalization::title::{strip_command_prefix, GameQuery};
use crate::providers::itad::ItadProvider;
use crate::providers::steam::SteamStoreClient;
use crate::providers::thumbnail::{HttpThumbnailer, Thumbnailer};
use crate::providers::translate::{ChatTranslator, DisabledTranslator, Translator};
use crate::reply::ReplySink;

/// Long-lived, read-only state: configuration plus upstream clients.
pub struct PriceBot {
    pub(crate) config: Arc<BotConfig>,
    pub(crate) itad: ItadProvider,
    pub(crate) steam: SteamStoreClient,
    pub(crate) translator: Arc<dyn Translator>,
    pub(crate) thumbnailer: Arc<dyn Thumbnailer>,
}

impl PriceBot {
    pub fn new(config: BotConfig) -> Result<Self> {
        let timeout_secs = config.fetch_timeout.as_secs().max(1);
        let itad = ItadProvider::new(Some(&config.itad_base_url), Some(timeout_secs))?
            .with_api_key(config.itad_api_key.clone());
        let steam = SteamStoreClient::new(Some(&config.steam_base_url), Some(timeout_secs))?;
        let translator: Arc<dyn Translator> = match &config.translator {
            Some(t) => Arc::new(ChatTranslator::new(
                &t.api_base,
                t.api_key.clone(),
                t.model.clone(),
                timeout_secs,
            )?),
            None => Arc::new(DisabledTranslator),
        };
        let thumbnailer = Arc::new(HttpThumbnailer::new(
            config.gallery_timeout.as_secs().max(1),
        )?);

        Ok(Self {
            config: Arc::new(config),
            itad,
            steam,
            translator,
            thumbnailer,
        })
    }

    pub fn with_translator(mut self, translator: Arc<dyn Translator>) -> Self {
        self.translator = translator;
        self
    }

    pub fn with_thumbnailer(mut self, thumbnailer: Arc<dyn Thumbnailer>) -> Self {
        self.thumbnailer = thumbnailer;
        self
    }

    /// Price + history-low lookup for raw message text.
    ///
    /// Progress notices, the rendered result or the failure message all go to
    /// `replies`. The merged result is also returned for callers that want data.
    pub async fn lowest_price(&self, raw: &str, replies: &ReplySink) -> Option<AggregatedResult> {
        let ctx = RequestContext::new(self, replies);
        let span = info_span!("lookup", request_id = %ctx.request_id);
        async {
            let query = GameQuery::parse(strip_command_prefix(raw));
            info!(?query, "lookup: request received");
            let outcome = async {
                let app_id = resolver::resolve(&ctx, query).await?;
                aggregate::aggregate(&ctx, app_id).await
            }
            .await;
            match outcome {
                Ok(result) => {
                    info!(
                        appid = result.id.store_app_id,
                        gid = %result.id.aggregator_id,
                        backfilled = result.home_backfilled,
                        "lookup: done"
                    );
                    replies.send(render::render(&result));
                    Some(result)
                }
                Err(err) => {
                    warn!(%err, "lookup: request ended early");
                    replies.text(err.user_message());
                    None
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Gallery search for a free-text name.
    pub async fn search_games(&self, name: &str, replies: &ReplySink) {
        let ctx = RequestContext::new(self, replies);
        let span = info_span!("gallery", request_id = %ctx.request_id);
        async {
            match gallery::gallery(&ctx, name).await {
                Ok(reply) => replies.send(reply),
                Err(err) => {
                    warn!(%err, "gallery: request ended early");
                    replies.text(err.user_message());
                }
            }
        }
        .instrument(span)
        .await
    }
}
