// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

/// Picks the outbound proxy for the next browser session.
///
/// Rotation and authentication belong to implementations; the runtime
/// resolver only passes the endpoint through as `--proxy-server`.
pub trait ProxyProvider: Send + Sync {
    /// Proxy endpoint such as `http://proxy.example:8080`, or `None` to connect directly
    fn next_proxy(&self) -> Option<String>;
}

/// Always connects directly
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProxy;

impl ProxyProvider for NoProxy {
    fn next_proxy(&self) -> Option<String> {
        None
    }
}
