use anyhow::{anyhow, Result};
use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use std::time::Duration;

/// Image ready to be attached to a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub content_type: Option<String>,
    pub base64: String,
}

/// Turns an image URL into an attachable thumbnail. Scaling, if any, is up to the implementation.
#[async_trait]
pub trait Thumbnailer: Send + Sync {
    async fn fetch_thumbnail(&self, url: &str) -> Result<Thumbnail>;
}

/// Downloads the image and hands the bytes over base64-encoded.
#[derive(Debug, Clone)]
pub struct HttpThumbnailer {
    http: Client,
    max_bytes: usize,
}

impl HttpThumbnailer {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let http = Client::builder()
            .user_agent("steam-lowest/0.1")
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            http,
            max_bytes: 2 * 1024 * 1024,
        })
    }
}

#[async_trait]
impl Thumbnailer for HttpThumbnailer {
    async fn fetch_thumbnail(&self, url: &str) -> Result<Thumbnail> {
        let resp = self.http.get(url).send().await?.error_for_status()?;
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = resp.bytes().await?;
        if bytes.is_empty() {
            return Err(anyhow!("empty image body: {url}"));
        }
        if bytes.len() > self.max_bytes {
            return Err(anyhow!("image too large ({} bytes): {url}", bytes.len()));
        }
        Ok(Thumbnail {
            content_type,
            base64: base64::engine::general_purpose::STANDARD.encode(&bytes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn encodes_downloaded_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/img.jpg"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/jpeg")
                    .set_body_bytes(vec![1u8, 2, 3]),
            )
            .mount(&server)
            .await;

        let thumb = HttpThumbnailer::new(5)
            .unwrap()
            .fetch_thumbnail(&format!("{}/img.jpg", server.uri()))
            .await
            .unwrap();
        assert_eq!(thumb.base64, "AQID");
        assert_eq!(thumb.content_type.as_deref(), Some("image/jpeg"));
    }

    #[tokio::test]
    async fn missing_image_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let thumbnailer = HttpThumbnailer::new(5).unwrap();
        assert!(thumbnailer
            .fetch_thumbnail(&format!("{}/gone.jpg", server.uri()))
            .await
            .is_err());
    }
}
