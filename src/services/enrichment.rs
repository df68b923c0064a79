// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::models::error::ScrapeError;
use crate::models::scrape::{ExtractionResult, ScrapeResponse};
use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use tracing::debug;

/// Content type assumed when the image server does not declare one
pub const DEFAULT_IMAGE_MIME_TYPE: &str = "image/jpeg";

/// Media type of a `data:` URL that declares none (RFC 2397)
const DEFAULT_DATA_MIME_TYPE: &str = "text/plain;charset=US-ASCII";

/// Completes an extraction into the response returned to callers
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn enrich(&self, extraction: ExtractionResult) -> Result<ScrapeResponse, ScrapeError>;
}

/// Resolves the image's declared content type with a secondary GET.
///
/// Only a transport failure is an error. The response status is not
/// inspected: whatever the server labels its answer with is reported.
/// Inline `data:` images are not fetched; their own media type is used.
pub struct ContentTypeEnricher {
    client: reqwest::Client,
    user_agent: Option<String>,
    fallback_mime_type: String,
}

impl ContentTypeEnricher {
    pub fn new(fallback_mime_type: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), fallback_mime_type)
    }

    pub fn with_client(client: reqwest::Client, fallback_mime_type: impl Into<String>) -> Self {
        Self {
            client,
            user_agent: None,
            fallback_mime_type: fallback_mime_type.into(),
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }
}

impl Default for ContentTypeEnricher {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_MIME_TYPE)
    }
}

#[async_trait]
impl Enricher for ContentTypeEnricher {
    async fn enrich(&self, extraction: ExtractionResult) -> Result<ScrapeResponse, ScrapeError> {
        if let Some(inline) = extraction.image_url.strip_prefix("data:") {
            let mime_type = data_url_mime_type(inline).ok_or_else(|| ScrapeError::Enrichment {
                image_url: extraction.image_url.clone(),
                reason: "malformed data URL".to_string(),
            })?;
            return Ok(ScrapeResponse {
                description: extraction.description,
                image_url: extraction.image_url,
                mime_type,
            });
        }

        let mut request = self.client.get(&extraction.image_url);
        if let Some(agent) = &self.user_agent {
            request = request.header(USER_AGENT, agent);
        }

        let response = request.send().await.map_err(|e| ScrapeError::Enrichment {
            image_url: extraction.image_url.clone(),
            reason: e.to_string(),
        })?;

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(String::from)
            .unwrap_or_else(|| self.fallback_mime_type.clone());

        debug!(
            image_url = %extraction.image_url,
            status = %response.status(),
            %mime_type,
            "Image content type resolved"
        );

        Ok(ScrapeResponse {
            description: extraction.description,
            image_url: extraction.image_url,
            mime_type,
        })
    }
}

/// Media type of a `data:` URL body (the part after `data:`), `None` without a comma
fn data_url_mime_type(inline: &str) -> Option<String> {
    let (header, _) = inline.split_once(',')?;
    let header = header.trim();
    let header = header
        .strip_suffix(";base64")
        .or_else(|| header.strip_suffix(";BASE64"))
        .unwrap_or(header)
        .trim();

    if header.is_empty() {
        Some(DEFAULT_DATA_MIME_TYPE.to_string())
    } else if header.starts_with(';') {
        Some(format!("text/plain{}", header))
    } else {
        Some(header.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extraction(image_url: String) -> ExtractionResult {
        ExtractionResult {
            description: "Widget\n\nGreat\nProduct".to_string(),
            image_url,
        }
    }

    #[tokio::test]
    async fn test_uses_declared_content_type() {
        let mut server = mockito::Server::new_async().await;
        let _image = server
            .mock("GET", "/x.png")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body([0x89, b'P', b'N', b'G'])
            .create_async()
            .await;
        let image_url = format!("{}/x.png", server.url());

        let response = ContentTypeEnricher::default()
            .enrich(extraction(image_url.clone()))
            .await
            .unwrap();

        assert_eq!(
            response,
            ScrapeResponse {
                description: "Widget\n\nGreat\nProduct".to_string(),
                image_url,
                mime_type: "image/png".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_missing_content_type_falls_back() {
        let mut server = mockito::Server::new_async().await;
        let _image = server
            .mock("GET", "/x")
            .with_status(200)
            .create_async()
            .await;

        let response = ContentTypeEnricher::default()
            .enrich(extraction(format!("{}/x", server.url())))
            .await
            .unwrap();

        assert_eq!(response.mime_type, "image/jpeg");
    }

    #[tokio::test]
    async fn test_configured_fallback() {
        let mut server = mockito::Server::new_async().await;
        let _image = server
            .mock("GET", "/x")
            .with_status(200)
            .create_async()
            .await;

        let response = ContentTypeEnricher::new("application/octet-stream")
            .enrich(extraction(format!("{}/x", server.url())))
            .await
            .unwrap();

        assert_eq!(response.mime_type, "application/octet-stream");
    }

    #[tokio::test]
    async fn test_error_status_still_reports_content_type() {
        let mut server = mockito::Server::new_async().await;
        let _image = server
            .mock("GET", "/gone.jpg")
            .with_status(404)
            .with_header("content-type", "text/html")
            .create_async()
            .await;

        let response = ContentTypeEnricher::default()
            .enrich(extraction(format!("{}/gone.jpg", server.url())))
            .await
            .unwrap();

        assert_eq!(response.mime_type, "text/html");
    }

    #[tokio::test]
    async fn test_sends_user_agent() {
        let mut server = mockito::Server::new_async().await;
        let image = server
            .mock("GET", "/x.jpg")
            .match_header("user-agent", "LalaScraperBot/1.0")
            .with_status(200)
            .with_header("content-type", "image/jpeg")
            .create_async()
            .await;

        ContentTypeEnricher::default()
            .with_user_agent("LalaScraperBot/1.0")
            .enrich(extraction(format!("{}/x.jpg", server.url())))
            .await
            .unwrap();

        image.assert_async().await;
    }

    #[tokio::test]
    async fn test_unreachable_image_is_enrichment_error() {
        let err = ContentTypeEnricher::default()
            .enrich(extraction("http://127.0.0.1:1/x.jpg".to_string()))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "enrichment_error");
        assert!(err.to_string().starts_with("Could not fetch image http://127.0.0.1:1/x.jpg: "));
    }

    #[tokio::test]
    async fn test_data_url_reports_inline_media_type() {
        let image_url = "data:image/png;base64,iVBORw0KGgo=".to_string();

        let response = ContentTypeEnricher::default()
            .enrich(extraction(image_url.clone()))
            .await
            .unwrap();

        assert_eq!(response.mime_type, "image/png");
        assert_eq!(response.image_url, image_url);
    }

    #[tokio::test]
    async fn test_malformed_data_url_is_enrichment_error() {
        let err = ContentTypeEnricher::default()
            .enrich(extraction("data:image/png;base64".to_string()))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "enrichment_error");
    }

    #[test]
    fn test_data_url_mime_type() {
        assert_eq!(data_url_mime_type("image/gif,GIF89a").as_deref(), Some("image/gif"));
        assert_eq!(
            data_url_mime_type("image/svg+xml;charset=utf-8,<svg/>").as_deref(),
            Some("image/svg+xml;charset=utf-8")
        );
        assert_eq!(
            data_url_mime_type(",hello").as_deref(),
            Some("text/plain;charset=US-ASCII")
        );
        assert_eq!(
            data_url_mime_type(";base64,aGk=").as_deref(),
            Some("text/plain;charset=US-ASCII")
        );
        assert_eq!(
            data_url_mime_type(";charset=utf-8,hi").as_deref(),
            Some("text/plain;charset=utf-8")
        );
        assert_eq!(data_url_mime_type("image/png"), None);
    }
}
