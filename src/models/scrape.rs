// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use serde::{Deserialize, Serialize};

/// Body of `POST /scrape`
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ScrapeRequest {
    /// The page to scrape. Absent and empty are both treated as missing.
    #[serde(default)]
    pub url: Option<String>,
}

/// Outcome of evaluating a site's robots.txt for the configured bot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyDecision {
    pub allowed: bool,
}

/// Raw record pulled out of a rendered page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub description: String,
    pub image_url: String,
}

impl ExtractionResult {
    /// Both fields must be non-empty before the record can be enriched.
    pub fn is_complete(&self) -> bool {
        !self.description.is_empty() && !self.image_url.is_empty()
    }
}

/// Externally visible scrape result, identical whether fresh or cached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeResponse {
    pub description: String,
    pub image_url: String,
    pub mime_type: String,
}

/// JSON error body: `{"error": "..."}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
