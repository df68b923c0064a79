// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Process configuration. Every flag can also be set from the environment.

use crate::models::deployment::DeploymentMode;
use crate::models::launch::DeploymentContext;
use crate::services::cache::EvictionPolicy;
use crate::services::enrichment::DEFAULT_IMAGE_MIME_TYPE;
use crate::services::quiescence::QuiescenceWindow;
use crate::services::renderer::RenderSettings;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Bot name matched against robots.txt `User-agent` groups
pub const DEFAULT_POLICY_AGENT: &str = "LalaScraperBot/1.0";

/// User-Agent presented by the browser and the image fetch
pub const DEFAULT_USER_AGENT: &str =
    "LalaScraperBot/1.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

#[derive(Debug, Clone, Parser)]
#[command(
    name = "lala-scraper",
    version = env!("LALA_VERSION"),
    about = "Policy-gated page scraping service"
)]
pub struct ScraperConfig {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 3001)]
    pub port: u16,

    /// `production` searches known locations for a browser executable
    #[arg(long, env = "DEPLOYMENT_MODE", default_value_t = DeploymentMode::Development)]
    pub deployment_mode: DeploymentMode,

    /// Browser executable to prefer in production, if it exists
    #[arg(long, env = "CHROME_EXECUTABLE_PATH")]
    pub executable_path: Option<PathBuf>,

    /// Where downloaded browsers live, one subdirectory per version
    #[arg(long, env = "BROWSER_CACHE_DIR")]
    pub browser_cache_dir: Option<PathBuf>,

    /// Parent directory of the per-session browser profiles
    #[arg(long, env = "SCRAPER_PROFILES_DIR")]
    pub profiles_dir: Option<PathBuf>,

    /// System Chrome path tried before the well-known install locations
    #[arg(long, env = "CHROME_PATH")]
    pub chrome_path: Option<PathBuf>,

    #[arg(long, env = "SCRAPER_POLICY_AGENT", default_value = DEFAULT_POLICY_AGENT)]
    pub policy_agent: String,

    #[arg(long, env = "SCRAPER_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Bound on navigation plus waiting for the network to go quiet
    #[arg(long, env = "SCRAPER_NAVIGATION_TIMEOUT_SECS", default_value_t = 30)]
    pub navigation_timeout_secs: u64,

    /// Concurrent browser sessions
    #[arg(long, env = "SCRAPER_MAX_SESSIONS", default_value_t = 4)]
    pub max_sessions: usize,

    /// Cached results kept before the least recently used is dropped
    #[arg(long, env = "SCRAPER_CACHE_MAX_ENTRIES")]
    pub cache_max_entries: Option<usize>,

    /// Age after which a cached result is scraped again
    #[arg(long, env = "SCRAPER_CACHE_TTL_SECS")]
    pub cache_ttl_secs: Option<u64>,

    /// Reported when the image server sends no Content-Type
    #[arg(long, env = "SCRAPER_FALLBACK_MIME_TYPE", default_value = DEFAULT_IMAGE_MIME_TYPE)]
    pub fallback_mime_type: String,
}

impl ScraperConfig {
    /// `BROWSER_CACHE_DIR`, or `<user cache dir>/lala-scraper/chromium`.
    pub fn browser_cache_dir(&self) -> PathBuf {
        self.browser_cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join("lala-scraper")
                .join("chromium")
        })
    }

    pub fn deployment_context(&self) -> DeploymentContext {
        DeploymentContext {
            mode: self.deployment_mode,
            executable_override: self.executable_path.clone(),
            cache_dir: Some(self.browser_cache_dir()),
            system_chrome_path: self.chrome_path.clone(),
        }
    }

    pub fn eviction_policy(&self) -> EvictionPolicy {
        let mut policy = EvictionPolicy::unbounded();
        if let Some(max_entries) = self.cache_max_entries {
            policy = policy.with_max_entries(max_entries);
        }
        if let Some(ttl) = self.cache_ttl_secs {
            policy = policy.with_ttl(Duration::from_secs(ttl));
        }
        policy
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            user_agent: self.user_agent.clone(),
            navigation_timeout: Duration::from_secs(self.navigation_timeout_secs),
            quiescence: QuiescenceWindow::default(),
            max_sessions: self.max_sessions,
            browser_cache_dir: self.browser_cache_dir(),
            profiles_dir: self.profiles_dir.clone(),
        }
    }
}
