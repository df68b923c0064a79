// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use crate::models::deployment::DeploymentMode;
use std::path::PathBuf;

/// How a single browser session is launched. Built per request, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfiguration {
    pub headless: bool,
    /// Extra command line arguments passed to Chrome
    pub args: Vec<String>,
    /// `None` lets the rendering engine pick or download its own browser
    pub executable_path: Option<PathBuf>,
}

/// Environment-derived inputs of the runtime resolver
#[derive(Debug, Clone, Default)]
pub struct DeploymentContext {
    pub mode: DeploymentMode,
    /// Explicit executable, used only if it exists on disk
    pub executable_override: Option<PathBuf>,
    /// Directory holding downloaded browser versions, one subdirectory each
    pub cache_dir: Option<PathBuf>,
    /// Operator-supplied system Chrome path, tried before the well-known ones
    pub system_chrome_path: Option<PathBuf>,
}
