// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Render & extract: one disposable headless Chromium per request.
//!
//! A session is launched with its own temporary profile, navigates once,
//! waits for the network to go quiet, evaluates the extractor's DOM query in
//! the live page and is closed again whatever happened in between. A
//! semaphore caps how many sessions are alive at the same time.

use crate::models::error::ScrapeError;
use crate::models::launch::LaunchConfiguration;
use crate::models::scrape::ExtractionResult;
use crate::services::extractor::PageExtractor;
use crate::services::quiescence::{QuiescenceTracker, QuiescenceWindow};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{OnceCell, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use url::Url;

/// Returned when the page rendered but the product fields were not found.
pub const DETAILS_NOT_FOUND: &str =
    "Could not find product details on the page. Selectors might be outdated.";

/// Renders a page and extracts a complete [`ExtractionResult`] from it
#[async_trait]
pub trait RenderExecutor: Send + Sync {
    async fn execute(
        &self,
        target: &Url,
        launch: &LaunchConfiguration,
    ) -> Result<ExtractionResult, ScrapeError>;
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    /// User-Agent presented by every request the session makes
    pub user_agent: String,
    /// Bound on navigation plus the wait for quiescence
    pub navigation_timeout: Duration,
    pub quiescence: QuiescenceWindow,
    /// Maximum number of concurrently running browser sessions
    pub max_sessions: usize,
    /// Download target when no local browser can be found
    pub browser_cache_dir: PathBuf,
    /// Parent of the per-session profile directories; system temp dir if unset
    pub profiles_dir: Option<PathBuf>,
}

pub struct ChromiumExecutor {
    settings: RenderSettings,
    extractor: Arc<dyn PageExtractor>,
    sessions: Arc<Semaphore>,
    managed_browser: OnceCell<PathBuf>,
}

impl ChromiumExecutor {
    pub fn new(settings: RenderSettings, extractor: Arc<dyn PageExtractor>) -> Self {
        let sessions = Arc::new(Semaphore::new(settings.max_sessions.max(1)));
        Self {
            settings,
            extractor,
            sessions,
            managed_browser: OnceCell::new(),
        }
    }

    /// Session slots not currently in use
    pub fn available_sessions(&self) -> usize {
        self.sessions.available_permits()
    }

    fn create_profile(&self) -> Result<TempDir, ScrapeError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("lala-scraper-session-");
        let profile = match &self.settings.profiles_dir {
            Some(dir) => builder.tempdir_in(dir),
            None => builder.tempdir(),
        };
        profile.map_err(|e| render_error("Failed to create browser profile", e))
    }

    async fn launch_session(
        &self,
        launch: &LaunchConfiguration,
    ) -> Result<BrowserSession, ScrapeError> {
        let profile = self.create_profile()?;
        let timeout = self.settings.navigation_timeout;
        let explicit = launch.executable_path.as_deref();

        let config = match browser_config(launch, profile.path(), explicit, timeout) {
            Ok(config) => config,
            Err(reason) if explicit.is_none() => {
                debug!("No local browser detected ({}), using managed Chromium", reason);
                let managed = self.managed_browser().await?;
                browser_config(launch, profile.path(), Some(managed), timeout)
                    .map_err(|e| render_error("Invalid browser configuration", e))?
            }
            Err(reason) => return Err(render_error("Invalid browser configuration", reason)),
        };

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| render_error("Failed to launch browser", e))?;

        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok(BrowserSession {
            browser,
            handler,
            _profile: profile,
        })
    }

    /// Chromium downloaded into the browser cache directory, fetched at most once.
    async fn managed_browser(&self) -> Result<&Path, ScrapeError> {
        let path = self
            .managed_browser
            .get_or_try_init(|| download_managed_browser(&self.settings.browser_cache_dir))
            .await?;
        Ok(path.as_path())
    }

    /// Navigate, wait for quiescence, then run the extractor's query in the page.
    async fn render(
        &self,
        session: &BrowserSession,
        target: &Url,
    ) -> Result<serde_json::Value, ScrapeError> {
        let page = session
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| render_error("Failed to open page", e))?;

        page.set_user_agent(self.settings.user_agent.as_str())
            .await
            .map_err(|e| render_error("Failed to set user agent", e))?;

        let timeout = self.settings.navigation_timeout;
        tokio::time::timeout(timeout, self.navigate(&page, target))
            .await
            .map_err(|_| {
                ScrapeError::Render(format!(
                    "Navigation to {} timed out after {:?}",
                    target, timeout
                ))
            })??;

        page.evaluate(self.extractor.script().to_string())
            .await
            .map_err(|e| render_error("Failed to evaluate extraction script", e))?
            .into_value::<serde_json::Value>()
            .map_err(|e| render_error("Failed to read extraction result", e))
    }

    /// Navigate and wait until the network is quiet.
    async fn navigate(&self, page: &Page, target: &Url) -> Result<(), ScrapeError> {
        let listen_error = |e: CdpError| render_error("Failed to watch network", e);
        let mut started = page
            .event_listener::<EventRequestWillBeSent>()
            .await
            .map_err(listen_error)?;
        let mut finished = page
            .event_listener::<EventLoadingFinished>()
            .await
            .map_err(listen_error)?;
        let mut failed = page
            .event_listener::<EventLoadingFailed>()
            .await
            .map_err(listen_error)?;

        page.goto(target.as_str()).await.map_err(|e| {
            ScrapeError::Render(format!("Navigation to {} failed: {}", target, e))
        })?;

        let idle = self.settings.quiescence.idle;
        let mut tracker = QuiescenceTracker::new(self.settings.quiescence, Instant::now());
        loop {
            let wake = tracker
                .settles_at()
                .unwrap_or_else(|| Instant::now() + idle);

            tokio::select! {
                Some(event) = started.next() => {
                    tracker.request_started(event.request_id.inner().clone(), Instant::now());
                }
                Some(event) = finished.next() => {
                    tracker.request_finished(event.request_id.inner(), Instant::now());
                }
                Some(event) = failed.next() => {
                    tracker.request_finished(event.request_id.inner(), Instant::now());
                }
                _ = tokio::time::sleep_until(wake) => {
                    if tracker.is_settled(Instant::now()) {
                        debug!(url = %target, in_flight = tracker.in_flight(), "Network quiet");
                        return Ok(());
                    }
                }
            }
        }
    }
}

#[async_trait]
impl RenderExecutor for ChromiumExecutor {
    async fn execute(
        &self,
        target: &Url,
        launch: &LaunchConfiguration,
    ) -> Result<ExtractionResult, ScrapeError> {
        let _permit = self
            .sessions
            .acquire()
            .await
            .map_err(|_| ScrapeError::Render("Browser session pool is closed".to_string()))?;

        let session = self.launch_session(launch).await?;
        let rendered = self.render(&session, target).await;
        session.close().await;

        let extraction = self.extractor.extract(rendered?);
        if !extraction.is_complete() {
            return Err(ScrapeError::ExtractionIncomplete(
                DETAILS_NOT_FOUND.to_string(),
            ));
        }
        Ok(extraction)
    }
}

/// A launched browser and everything that must be cleaned up with it
struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    // Deleted from disk on drop
    _profile: TempDir,
}

impl BrowserSession {
    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("Failed to close browser: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            warn!("Failed to wait for browser exit: {}", e);
        }
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

fn render_error(context: &str, e: impl std::fmt::Display) -> ScrapeError {
    ScrapeError::Render(format!("{}: {}", context, e))
}

fn browser_config(
    launch: &LaunchConfiguration,
    profile: &Path,
    executable: Option<&Path>,
    request_timeout: Duration,
) -> Result<BrowserConfig, String> {
    let mut builder = BrowserConfig::builder()
        .request_timeout(request_timeout)
        .user_data_dir(profile);

    if !launch.headless {
        builder = builder.with_head();
    }
    if let Some(path) = executable {
        builder = builder.chrome_executable(path);
    }
    for arg in &launch.args {
        builder = builder.arg(arg.as_str());
    }

    builder.build()
}

async fn download_managed_browser(cache_dir: &Path) -> Result<PathBuf, ScrapeError> {
    info!("Downloading managed Chromium into {}", cache_dir.display());

    tokio::fs::create_dir_all(cache_dir)
        .await
        .map_err(|e| render_error("Failed to create browser cache", e))?;

    let options = BrowserFetcherOptions::builder()
        .with_path(cache_dir)
        .build()
        .map_err(|e| render_error("Failed to configure browser download", e))?;

    let installed = BrowserFetcher::new(options)
        .fetch()
        .await
        .map_err(|e| render_error("Failed to download browser", e))?;

    info!("Managed Chromium ready at {}", installed.executable_path.display());
    Ok(installed.executable_path)
}
