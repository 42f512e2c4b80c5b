//! Free-text title translation.
//!
//! The lookup only needs "given a string, best-guess English store title, or fail".
//! `ChatTranslator` asks an OpenAI-compatible chat endpoint for it.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::providers::itad::provider::truncate_for_log;

#[async_trait]
pub trait Translator: Send + Sync {
    /// Official English storefront title for `text`.
    async fn translate_title(&self, text: &str) -> Result<String>;
}

/// Used when no translation endpoint is configured; every call fails.
#[derive(Debug, Clone, Default)]
pub struct DisabledTranslator;

#[async_trait]
impl Translator for DisabledTranslator {
    async fn translate_title(&self, _text: &str) -> Result<String> {
        Err(anyhow!("no translation endpoint configured"))
    }
}

#[derive(Debug, Clone)]
pub struct ChatTranslator {
    api_base: String,
    api_key: Option<String>,
    model: String,
    http: Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: Value,
}

impl ChatTranslator {
    pub fn new(
        api_base: &str,
        api_key: Option<String>,
        model: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            http,
        })
    }

    fn prompt(text: &str) -> String {
        format!("请将以下游戏名翻译为steam页面的英文官方名称，仅输出英文名，不要输出其他内容：{text}")
    }
}

#[async_trait]
impl Translator for ChatTranslator {
    async fn translate_title(&self, text: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: Self::prompt(text),
            }],
            temperature: 0.0,
        };

        let mut req = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .json(&request);
        if let Some(key) = self.api_key.as_deref() {
            req = req.bearer_auth(key);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = truncate_for_log(resp.text().await.unwrap_or_default(), 500);
            return Err(anyhow!("translation request failed: {status} body={body}"));
        }

        let parsed: ChatResponse = resp.json().await?;
        let title = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.get("content").and_then(|v| v.as_str()).map(str::to_string))
            .map(|s| s.trim().trim_matches(['"', '《', '》']).trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("translation response had no content"))?;
        debug!(input = text, output = %title, "translate: title translated");
        Ok(title)
    }
}
