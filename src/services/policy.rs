// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::models::error::ScrapeError;
use crate::models::scrape::PolicyDecision;
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::StatusCode;
use texting_robots::{get_robots_url, Robot};
use tracing::debug;
use url::Url;

/// Decides whether a target may be fetched at all
#[async_trait]
pub trait PolicyGate: Send + Sync {
    async fn decide(&self, target: &Url) -> Result<PolicyDecision, ScrapeError>;
}

/// robots.txt policy for a fixed bot name.
///
/// The document is fetched fresh on every call. Anything short of a parsed
/// 200 response is a `PolicyFetch` error: permission is unknown, so the
/// request is neither allowed nor denied.
pub struct RobotsPolicy {
    client: reqwest::Client,
    agent: String,
}

impl RobotsPolicy {
    pub fn new(agent: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), agent)
    }

    pub fn with_client(client: reqwest::Client, agent: impl Into<String>) -> Self {
        Self {
            client,
            agent: agent.into(),
        }
    }

    pub fn agent(&self) -> &str {
        &self.agent
    }
}

#[async_trait]
impl PolicyGate for RobotsPolicy {
    async fn decide(&self, target: &Url) -> Result<PolicyDecision, ScrapeError> {
        let robots_url = get_robots_url(target.as_str())
            .map_err(|e| fetch_error(target.as_str(), e.to_string()))?;

        let response = self
            .client
            .get(&robots_url)
            .header(USER_AGENT, &self.agent)
            .send()
            .await
            .map_err(|e| fetch_error(&robots_url, e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(fetch_error(&robots_url, format!("HTTP {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| fetch_error(&robots_url, e.to_string()))?;

        let robot = Robot::new(&self.agent, &body)
            .map_err(|e| fetch_error(&robots_url, format!("malformed robots.txt: {}", e)))?;

        let allowed = robot.allowed(target.as_str());
        debug!(%robots_url, agent = %self.agent, allowed, "robots.txt evaluated");

        Ok(PolicyDecision { allowed })
    }
}

fn fetch_error(robots_url: &str, reason: String) -> ScrapeError {
    ScrapeError::PolicyFetch {
        robots_url: robots_url.to_string(),
        reason,
    }
}
