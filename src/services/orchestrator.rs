// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! The scrape pipeline: validate, check policy, consult the cache, then
//! resolve a browser, render, enrich and store the result.
//!
//! Invalid input, policy denial and cache hits return before any browser
//! work starts. Concurrent misses for the same URL share one pipeline run.

use crate::models::error::{ScrapeError, URL_REQUIRED};
use crate::models::launch::DeploymentContext;
use crate::models::scrape::ScrapeResponse;
use crate::services::cache::{MemoryStore, ResponseStore};
use crate::services::enrichment::Enricher;
use crate::services::logging::redact_url;
use crate::services::policy::PolicyGate;
use crate::services::renderer::RenderExecutor;
use crate::services::runtime::RuntimeResolver;
use crate::services::single_flight::SingleFlight;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

/// Where a request is in the pipeline; used to label log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrapeStage {
    Validating,
    PolicyCheck,
    CacheLookup,
    Resolving,
    Rendering,
    Enriching,
    Caching,
    Responding,
}

impl fmt::Display for ScrapeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScrapeStage::Validating => "validating",
            ScrapeStage::PolicyCheck => "policy_check",
            ScrapeStage::CacheLookup => "cache_lookup",
            ScrapeStage::Resolving => "resolving",
            ScrapeStage::Rendering => "rendering",
            ScrapeStage::Enriching => "enriching",
            ScrapeStage::Caching => "caching",
            ScrapeStage::Responding => "responding",
        };
        f.write_str(name)
    }
}

type PipelineResult = Result<ScrapeResponse, ScrapeError>;

pub struct ScrapeService {
    policy: Arc<dyn PolicyGate>,
    store: Arc<dyn ResponseStore>,
    flights: SingleFlight<PipelineResult>,
    resolver: RuntimeResolver,
    context: DeploymentContext,
    executor: Arc<dyn RenderExecutor>,
    enricher: Arc<dyn Enricher>,
}

impl ScrapeService {
    /// A service with an unbounded in-memory cache, the real filesystem
    /// resolver and a development deployment context.
    pub fn new(
        policy: Arc<dyn PolicyGate>,
        executor: Arc<dyn RenderExecutor>,
        enricher: Arc<dyn Enricher>,
    ) -> Self {
        Self {
            policy,
            store: Arc::new(MemoryStore::default()),
            flights: SingleFlight::new(),
            resolver: RuntimeResolver::new(),
            context: DeploymentContext::default(),
            executor,
            enricher,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ResponseStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_resolver(mut self, resolver: RuntimeResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_context(mut self, context: DeploymentContext) -> Self {
        self.context = context;
        self
    }

    pub fn store(&self) -> &dyn ResponseStore {
        self.store.as_ref()
    }

    /// Scrape `raw_url`, or answer from the cache when it was scraped before.
    pub async fn scrape(&self, raw_url: Option<&str>) -> Result<ScrapeResponse, ScrapeError> {
        let target = match validate_target(raw_url) {
            Ok(target) => target,
            Err(e) => {
                let url = raw_url.map(redact_url).unwrap_or_default();
                warn!(
                    stage = %ScrapeStage::Validating,
                    kind = e.kind(),
                    %url,
                    "Rejected scrape request: {}",
                    e
                );
                return Err(e);
            }
        };
        let url = redact_url(target.as_str());

        debug!(stage = %ScrapeStage::PolicyCheck, %url);
        let decision = self
            .policy
            .decide(&target)
            .await
            .map_err(|e| failed(ScrapeStage::PolicyCheck, &url, e))?;
        if !decision.allowed {
            return Err(failed(ScrapeStage::PolicyCheck, &url, ScrapeError::PolicyDenied));
        }

        debug!(stage = %ScrapeStage::CacheLookup, %url);
        let key = target.as_str();
        if let Some(cached) = self.store.get(key) {
            info!(%url, "Serving cached scrape result");
            return Ok(cached);
        }

        let flight = self
            .flights
            .run(key, || self.run_pipeline(&target, &url))
            .await;
        if flight.shared {
            debug!(%url, "Joined scrape already in progress");
        }

        // Failures were logged by the run that produced them
        let response = flight.value?;
        debug!(stage = %ScrapeStage::Responding, %url);
        Ok(response)
    }

    /// Resolve, render, enrich and cache. Runs once per coalesced group.
    async fn run_pipeline(&self, target: &Url, url: &str) -> PipelineResult {
        // A run that finished between our lookup and joining the flight
        if let Some(cached) = self.store.get(target.as_str()) {
            return Ok(cached);
        }

        debug!(stage = %ScrapeStage::Resolving, %url);
        let launch = self.resolver.resolve(&self.context);

        debug!(stage = %ScrapeStage::Rendering, %url, executable = ?launch.executable_path);
        let extraction = self
            .executor
            .execute(target, &launch)
            .await
            .map_err(|e| failed(ScrapeStage::Rendering, url, e))?;

        debug!(stage = %ScrapeStage::Enriching, %url, image_url = %extraction.image_url);
        let response = self
            .enricher
            .enrich(extraction)
            .await
            .map_err(|e| failed(ScrapeStage::Enriching, url, e))?;

        debug!(stage = %ScrapeStage::Caching, %url);
        self.store.put(target.as_str(), response.clone());
        info!(%url, mime_type = %response.mime_type, "Scraped page");

        Ok(response)
    }
}

fn failed(stage: ScrapeStage, url: &str, e: ScrapeError) -> ScrapeError {
    if e.is_client_error() {
        warn!(%stage, kind = e.kind(), %url, "Scrape refused: {}", e);
    } else {
        error!(%stage, kind = e.kind(), %url, "Scrape failed: {}", e);
    }
    e
}

/// A present, absolute `http`/`https` URL with a host.
pub fn validate_target(raw_url: Option<&str>) -> Result<Url, ScrapeError> {
    let raw = raw_url
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| ScrapeError::InvalidInput(URL_REQUIRED.to_string()))?;

    let url = Url::parse(raw).map_err(|e| invalid_url(e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid_url(format!("unsupported scheme '{}'", url.scheme())));
    }
    if !url.host_str().is_some_and(|host| !host.is_empty()) {
        return Err(invalid_url("missing host".to_string()));
    }

    Ok(url)
}

fn invalid_url(detail: String) -> ScrapeError {
    ScrapeError::InvalidInput(format!("Invalid URL: {}", detail))
}
