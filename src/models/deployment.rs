// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

use std::str::FromStr;

/// Deployment mode controlling how the browser runtime is located.
///
/// Development: the rendering engine finds (or downloads) its own browser.
///
/// Production: the runtime resolver checks the override path, the browser
/// cache directory and the well-known system install paths before falling
/// back to the engine's own browser. Used in containers where Chrome lives
/// in a non-standard location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeploymentMode {
    #[default]
    Development,
    Production,
}

impl DeploymentMode {
    pub fn is_production(&self) -> bool {
        matches!(self, DeploymentMode::Production)
    }
}

impl FromStr for DeploymentMode {
    type Err = String;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        match mode.trim().to_ascii_lowercase().as_str() {
            "development" => Ok(DeploymentMode::Development),
            "production" => Ok(DeploymentMode::Production),
            _ => Err(format!(
                "DEPLOYMENT_MODE must be 'development' or 'production', got: {}",
                mode
            )),
        }
    }
}

// Display gives the lowercase form accepted by FromStr, not the Debug form.
impl std::fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeploymentMode::Development => write!(f, "development"),
            DeploymentMode::Production => write!(f, "production"),
        }
    }
}
