// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Browser executable resolution.
//!
//! In production the resolver walks an ordered list of strategies and stops
//! at the first executable that exists on disk:
//!
//! 1. the configured override path
//! 2. version directories inside the browser cache directory
//! 3. the operator's `CHROME_PATH`, then well-known system install paths
//!
//! If none match, or outside production, no path is set and the rendering
//! engine supplies its own browser.

use crate::models::launch::{DeploymentContext, LaunchConfiguration};
use crate::services::logging::redact_url;
use crate::services::proxy::{NoProxy, ProxyProvider};
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Arguments every session needs to run inside a container
pub const BASELINE_ARGS: &[&str] = &[
    "--no-sandbox",
    "--disable-setuid-sandbox",
    "--disable-dev-shm-usage",
    "--disable-gpu",
];

/// Where the binary sits inside one version directory of the cache
pub const CACHED_BINARY_LOCATIONS: &[&str] = &[
    "chrome-linux64/chrome",
    "chrome-linux/chrome",
    "chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing",
    "chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing",
    "chrome-win64/chrome.exe",
];

pub const SYSTEM_CHROME_PATHS: &[&str] = &[
    "/usr/bin/google-chrome-stable",
    "/usr/bin/google-chrome",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/opt/google/chrome/chrome",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
];

/// Read-only view of the filesystem used while probing for executables
pub trait FileLookup: Send + Sync {
    fn exists(&self, path: &Path) -> bool;
    /// Immediate subdirectories of `dir`; empty if it cannot be read
    fn list_dirs(&self, dir: &Path) -> Vec<PathBuf>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RealFileSystem;

impl FileLookup for RealFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list_dirs(&self, dir: &Path) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };
        entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect()
    }
}

/// One way of finding a browser executable
pub trait ExecutableStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn locate(&self, fs: &dyn FileLookup) -> Option<PathBuf>;
}

/// An explicitly configured executable
pub struct OverridePath {
    path: Option<PathBuf>,
}

impl OverridePath {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self { path }
    }
}

impl ExecutableStrategy for OverridePath {
    fn name(&self) -> &'static str {
        "override_path"
    }

    fn locate(&self, fs: &dyn FileLookup) -> Option<PathBuf> {
        let path = self.path.as_ref()?;
        if fs.exists(path) {
            return Some(path.clone());
        }
        warn!(
            "Configured browser executable does not exist: {}",
            path.display()
        );
        None
    }
}

/// Installed browser versions under a cache directory, newest first
pub struct CacheDirScan {
    cache_dir: Option<PathBuf>,
}

impl CacheDirScan {
    pub fn new(cache_dir: Option<PathBuf>) -> Self {
        Self { cache_dir }
    }
}

impl ExecutableStrategy for CacheDirScan {
    fn name(&self) -> &'static str {
        "cache_dir_scan"
    }

    fn locate(&self, fs: &dyn FileLookup) -> Option<PathBuf> {
        let cache_dir = self.cache_dir.as_ref()?;

        let mut versions = fs.list_dirs(cache_dir);
        versions.sort_by(|a, b| newest_first(a, b));

        versions.iter().find_map(|version| {
            CACHED_BINARY_LOCATIONS
                .iter()
                .map(|relative| version.join(relative))
                .find(|candidate| fs.exists(candidate))
        })
    }
}

/// Dotted numeric version of a version directory, after any `<platform>-` prefix
fn version_key(dir: &Path) -> Option<Vec<u64>> {
    let name = dir.file_name()?.to_str()?;
    let version = name.rsplit_once('-').map_or(name, |(_, version)| version);
    version
        .split('.')
        .map(|part| part.parse::<u64>().ok())
        .collect()
}

/// Highest numeric version first; unversioned names last, by reverse name
fn newest_first(a: &Path, b: &Path) -> Ordering {
    match (version_key(a), version_key(b)) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.file_name().cmp(&a.file_name()),
    }
}

/// Fixed list of system install locations
pub struct SystemPaths {
    candidates: Vec<PathBuf>,
}

impl SystemPaths {
    /// Well-known paths, preceded by `env_override` when given.
    pub fn new(env_override: Option<PathBuf>) -> Self {
        let candidates = env_override
            .into_iter()
            .chain(SYSTEM_CHROME_PATHS.iter().map(PathBuf::from))
            .collect();
        Self { candidates }
    }
}

impl ExecutableStrategy for SystemPaths {
    fn name(&self) -> &'static str {
        "system_paths"
    }

    fn locate(&self, fs: &dyn FileLookup) -> Option<PathBuf> {
        self.candidates
            .iter()
            .find(|candidate| fs.exists(candidate))
            .cloned()
    }
}

/// The strategy chain for a deployment, in priority order
pub fn strategies_for(context: &DeploymentContext) -> Vec<Box<dyn ExecutableStrategy>> {
    vec![
        Box::new(OverridePath::new(context.executable_override.clone())),
        Box::new(CacheDirScan::new(context.cache_dir.clone())),
        Box::new(SystemPaths::new(context.system_chrome_path.clone())),
    ]
}

/// Builds the [`LaunchConfiguration`] for each browser session
pub struct RuntimeResolver {
    fs: Arc<dyn FileLookup>,
    proxy: Arc<dyn ProxyProvider>,
}

impl RuntimeResolver {
    pub fn new() -> Self {
        Self {
            fs: Arc::new(RealFileSystem),
            proxy: Arc::new(NoProxy),
        }
    }

    pub fn with_file_lookup(mut self, fs: Arc<dyn FileLookup>) -> Self {
        self.fs = fs;
        self
    }

    pub fn with_proxy_provider(mut self, proxy: Arc<dyn ProxyProvider>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn resolve(&self, context: &DeploymentContext) -> LaunchConfiguration {
        let mut args: Vec<String> = BASELINE_ARGS.iter().map(|arg| arg.to_string()).collect();

        if let Some(proxy) = self.proxy.next_proxy() {
            debug!(proxy = %redact_url(&proxy), "Routing browser session through proxy");
            args.push(format!("--proxy-server={}", proxy));
        }

        let executable_path = if context.mode.is_production() {
            self.locate_executable(context)
        } else {
            None
        };

        LaunchConfiguration {
            headless: true,
            args,
            executable_path,
        }
    }

    /// First executable found by the strategy chain
    pub fn locate_executable(&self, context: &DeploymentContext) -> Option<PathBuf> {
        for strategy in strategies_for(context) {
            if let Some(path) = strategy.locate(self.fs.as_ref()) {
                info!(
                    strategy = strategy.name(),
                    "Using browser executable: {}",
                    path.display()
                );
                return Some(path);
            }
            debug!(strategy = strategy.name(), "No browser executable found");
        }

        info!("No browser executable found, using the rendering engine's own browser");
        None
    }
}

impl Default for RuntimeResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::deployment::DeploymentMode;
    use std::collections::{BTreeMap, HashSet};
    use std::sync::Mutex;

    /// In-memory filesystem that records every checked path
    #[derive(Default)]
    struct FakeFs {
        files: HashSet<PathBuf>,
        dirs: BTreeMap<PathBuf, Vec<PathBuf>>,
        checked: Mutex<Vec<PathBuf>>,
    }

    impl FakeFs {
        fn with_file(mut self, path: &str) -> Self {
            self.files.insert(PathBuf::from(path));
            self
        }

        fn with_dir(mut self, dir: &str, children: &[&str]) -> Self {
            let children = children.iter().map(|c| Path::new(dir).join(c)).collect();
            self.dirs.insert(PathBuf::from(dir), children);
            self
        }

        fn checked(&self) -> Vec<PathBuf> {
            self.checked.lock().unwrap().clone()
        }
    }

    impl FileLookup for FakeFs {
        fn exists(&self, path: &Path) -> bool {
            self.checked.lock().unwrap().push(path.to_path_buf());
            self.files.contains(path)
        }

        fn list_dirs(&self, dir: &Path) -> Vec<PathBuf> {
            self.dirs.get(dir).cloned().unwrap_or_default()
        }
    }

    struct FixedProxy(&'static str);

    impl ProxyProvider for FixedProxy {
        fn next_proxy(&self) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    fn production() -> DeploymentContext {
        DeploymentContext {
            mode: DeploymentMode::Production,
            executable_override: Some(PathBuf::from("/custom/chrome")),
            cache_dir: Some(PathBuf::from("/cache")),
            system_chrome_path: Some(PathBuf::from("/env/chrome")),
        }
    }

    fn resolver(fs: FakeFs) -> (RuntimeResolver, Arc<FakeFs>) {
        let fs = Arc::new(fs);
        let resolver = RuntimeResolver::new().with_file_lookup(fs.clone());
        (resolver, fs)
    }

    #[test]
    fn test_override_path_wins_first() {
        let fs = FakeFs::default()
            .with_file("/custom/chrome")
            .with_dir("/cache", &["121.0"])
            .with_file("/cache/121.0/chrome-linux64/chrome")
            .with_file("/usr/bin/google-chrome");
        let (resolver, fs) = resolver(fs);

        let config = resolver.resolve(&production());

        assert_eq!(config.executable_path, Some(PathBuf::from("/custom/chrome")));
        assert_eq!(fs.checked(), vec![PathBuf::from("/custom/chrome")]);
    }

    #[test]
    fn test_missing_override_falls_through_to_cache_scan() {
        let fs = FakeFs::default()
            .with_dir("/cache", &["120.0", "121.0"])
            .with_file("/cache/120.0/chrome-linux64/chrome")
            .with_file("/cache/121.0/chrome-linux/chrome")
            .with_file("/usr/bin/google-chrome");
        let (resolver, _) = resolver(fs);

        let config = resolver.resolve(&production());

        // Newest version directory is searched first
        assert_eq!(
            config.executable_path,
            Some(PathBuf::from("/cache/121.0/chrome-linux/chrome"))
        );
    }

    #[test]
    fn test_cache_dir_without_binaries_falls_through_to_system_paths() {
        let fs = FakeFs::default()
            .with_dir("/cache", &["121.0"])
            .with_file("/usr/bin/chromium");
        let (resolver, _) = resolver(fs);

        let config = resolver.resolve(&production());

        assert_eq!(config.executable_path, Some(PathBuf::from("/usr/bin/chromium")));
    }

    #[test]
    fn test_env_chrome_path_precedes_well_known_paths() {
        let fs = FakeFs::default()
            .with_file("/env/chrome")
            .with_file("/usr/bin/google-chrome-stable");
        let (resolver, _) = resolver(fs);

        let config = resolver.resolve(&production());

        assert_eq!(config.executable_path, Some(PathBuf::from("/env/chrome")));
    }

    #[test]
    fn test_nothing_found_leaves_path_unset() {
        let (resolver, fs) = resolver(FakeFs::default());

        let config = resolver.resolve(&production());

        assert_eq!(config.executable_path, None);
        assert!(config.headless);
        // override + env path + every well-known path were all tried
        assert_eq!(fs.checked().len(), 2 + SYSTEM_CHROME_PATHS.len());
    }

    #[test]
    fn test_development_never_touches_filesystem() {
        let fs = FakeFs::default().with_file("/custom/chrome");
        let (resolver, fs) = resolver(fs);
        let context = DeploymentContext {
            mode: DeploymentMode::Development,
            ..production()
        };

        let config = resolver.resolve(&context);

        assert_eq!(config.executable_path, None);
        assert!(fs.checked().is_empty());
    }

    #[test]
    fn test_baseline_args_always_present() {
        let (resolver, _) = resolver(FakeFs::default());

        for context in [production(), DeploymentContext::default()] {
            let config = resolver.resolve(&context);
            for arg in BASELINE_ARGS {
                assert!(config.args.iter().any(|a| a == arg), "missing {}", arg);
            }
        }
    }

    #[test]
    fn test_no_proxy_adds_no_argument() {
        let (resolver, _) = resolver(FakeFs::default());
        let config = resolver.resolve(&DeploymentContext::default());

        assert!(!config.args.iter().any(|a| a.starts_with("--proxy-server")));
    }

    #[test]
    fn test_proxy_is_appended_as_argument() {
        let resolver = RuntimeResolver::new()
            .with_file_lookup(Arc::new(FakeFs::default()))
            .with_proxy_provider(Arc::new(FixedProxy("http://proxy.example:8080")));

        let config = resolver.resolve(&DeploymentContext::default());

        assert_eq!(
            config.args.last().map(String::as_str),
            Some("--proxy-server=http://proxy.example:8080")
        );
    }

    #[test]
    fn test_real_filesystem_cache_scan() {
        let cache = tempfile::tempdir().unwrap();
        let binary = cache.path().join("119.0.6045.105/chrome-linux64/chrome");
        std::fs::create_dir_all(binary.parent().unwrap()).unwrap();
        std::fs::write(&binary, b"").unwrap();
        std::fs::create_dir_all(cache.path().join("empty-version")).unwrap();

        let strategy = CacheDirScan::new(Some(cache.path().to_path_buf()));

        assert_eq!(strategy.locate(&RealFileSystem), Some(binary));
    }

    #[test]
    fn test_real_filesystem_missing_cache_dir() {
        let strategy = CacheDirScan::new(Some(PathBuf::from("/definitely/not/here")));
        assert_eq!(strategy.locate(&RealFileSystem), None);
    }

    #[test]
    fn test_cache_scan_compares_versions_numerically() {
        let cache = tempfile::tempdir().unwrap();
        let mut binaries = Vec::new();
        for version in ["linux-99.0.4844.51", "linux-121.0.6167.85"] {
            let binary = cache.path().join(version).join("chrome-linux64/chrome");
            std::fs::create_dir_all(binary.parent().unwrap()).unwrap();
            std::fs::write(&binary, b"").unwrap();
            binaries.push(binary);
        }

        let strategy = CacheDirScan::new(Some(cache.path().to_path_buf()));

        assert_eq!(strategy.locate(&RealFileSystem), Some(binaries[1].clone()));
    }

    #[test]
    fn test_version_ordering() {
        let mut dirs: Vec<PathBuf> = ["beta", "120.0.1", "linux-9.1", "alpha", "mac-120.0.10"]
            .iter()
            .map(|name| Path::new("/cache").join(name))
            .collect();

        dirs.sort_by(|a, b| newest_first(a, b));

        let names: Vec<_> = dirs
            .iter()
            .filter_map(|d| d.file_name()?.to_str())
            .collect();
        assert_eq!(names, ["mac-120.0.10", "120.0.1", "linux-9.1", "beta", "alpha"]);
    }
}
