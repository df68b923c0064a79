// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use anyhow::Context;
use clap::Parser;
use lala_scraper::app::{create_router, AppState, VERSION};
use lala_scraper::config::ScraperConfig;
use lala_scraper::services::cache::MemoryStore;
use lala_scraper::services::enrichment::ContentTypeEnricher;
use lala_scraper::services::extractor::ProductPageExtractor;
use lala_scraper::services::logging::init_tracing;
use lala_scraper::services::orchestrator::ScrapeService;
use lala_scraper::services::policy::RobotsPolicy;
use lala_scraper::services::renderer::ChromiumExecutor;
use lala_scraper::services::runtime::RuntimeResolver;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ScraperConfig::parse();
    init_tracing("info");

    let client = reqwest::Client::builder()
        .build()
        .context("Failed to build HTTP client")?;

    let policy = RobotsPolicy::with_client(client.clone(), config.policy_agent.clone());
    let executor = ChromiumExecutor::new(
        config.render_settings(),
        Arc::new(ProductPageExtractor::default()),
    );
    let enricher = ContentTypeEnricher::with_client(client, config.fallback_mime_type.clone())
        .with_user_agent(config.user_agent.clone());

    let service = ScrapeService::new(Arc::new(policy), Arc::new(executor), Arc::new(enricher))
        .with_store(Arc::new(MemoryStore::new(config.eviction_policy())))
        .with_resolver(RuntimeResolver::new())
        .with_context(config.deployment_context());

    info!(
        deployment_mode = %config.deployment_mode,
        max_sessions = config.max_sessions,
        policy_agent = %config.policy_agent,
        "Scrape service configured"
    );

    let state = AppState {
        service: Arc::new(service),
        deployment_mode: config.deployment_mode,
    };
    let app = create_router(state);

    // Bind to 0.0.0.0 to accept connections from any network interface (required for Docker)
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("lala-scraper v{} listening on {}", VERSION, addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
