// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use thiserror::Error;

/// Message returned when a request carries no URL.
pub const URL_REQUIRED: &str = "URL is required";

/// Message returned when robots.txt forbids the request.
pub const POLICY_DENIED: &str = "Scraping is disallowed by this site's robots.txt";

/// Every way a scrape request can end without a result.
///
/// `Clone` so that requests coalesced onto one pipeline run can all
/// receive the same failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScrapeError {
    /// Missing or malformed URL; nothing was fetched
    #[error("{0}")]
    InvalidInput(String),

    /// robots.txt disallows the target for our bot
    #[error("{}", POLICY_DENIED)]
    PolicyDenied,

    /// robots.txt could not be fetched or parsed, so permission is unknown
    #[error("Could not read robots.txt at {robots_url}: {reason}")]
    PolicyFetch { robots_url: String, reason: String },

    /// Browser launch, navigation or page evaluation failed
    #[error("{0}")]
    Render(String),

    /// The page rendered but the required fields were not found
    #[error("{0}")]
    ExtractionIncomplete(String),

    /// The image could not be fetched to read its content type
    #[error("Could not fetch image {image_url}: {reason}")]
    Enrichment { image_url: String, reason: String },
}

impl ScrapeError {
    /// Short snake_case label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::InvalidInput(_) => "invalid_input",
            ScrapeError::PolicyDenied => "policy_denied",
            ScrapeError::PolicyFetch { .. } => "policy_fetch_error",
            ScrapeError::Render(_) => "render_error",
            ScrapeError::ExtractionIncomplete(_) => "extraction_incomplete",
            ScrapeError::Enrichment { .. } => "enrichment_error",
        }
    }

    /// Whether the caller, rather than the pipeline, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ScrapeError::InvalidInput(_) | ScrapeError::PolicyDenied
        )
    }
}
