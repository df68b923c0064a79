// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Application state, route handlers, error mapping and router construction.
//!
//! This module is `pub` so that integration tests can build a test router directly
//! without starting the full binary.

use crate::models::deployment::DeploymentMode;
use crate::models::error::{ScrapeError, URL_REQUIRED};
use crate::models::scrape::{ErrorResponse, ScrapeRequest, ScrapeResponse};
use crate::models::version::VersionResponse;
use crate::services::orchestrator::ScrapeService;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::debug;

/// Application version extracted from `Cargo.toml` at compile time.
/// The patch segment can be overridden via `LALA_PATCH_VERSION` (see `build.rs`).
pub const VERSION: &str = env!("LALA_VERSION");

/// Prefix of every 500 response body
pub const SCRAPE_FAILED_PREFIX: &str = "Failed to scrape the URL.";

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Shared application state injected into every route handler via `State<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<ScrapeService>,
    pub deployment_mode: DeploymentMode,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// A [`ScrapeError`] rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub ScrapeError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            ScrapeError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ScrapeError::PolicyDenied => StatusCode::FORBIDDEN,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> String {
        if self.0.is_client_error() {
            self.0.to_string()
        } else {
            format!("{} {}", SCRAPE_FAILED_PREFIX, self.0)
        }
    }
}

impl From<ScrapeError> for ApiError {
    fn from(e: ScrapeError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

pub async fn version_handler(State(state): State<AppState>) -> Json<VersionResponse> {
    Json(VersionResponse {
        service: "lala-scraper".to_string(),
        version: VERSION.to_string(),
        deployment_mode: state.deployment_mode.to_string(),
    })
}

pub async fn scrape_handler(
    State(state): State<AppState>,
    payload: Result<Json<ScrapeRequest>, JsonRejection>,
) -> Result<Json<ScrapeResponse>, ApiError> {
    // A body we cannot read carries no URL
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            debug!("Unreadable scrape request body: {}", rejection);
            return Err(ScrapeError::InvalidInput(URL_REQUIRED.to_string()).into());
        }
    };

    let response = state.service.scrape(request.url.as_deref()).await?;
    Ok(Json(response))
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the Axum application router. Cross-origin requests are allowed from anywhere.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/version", get(version_handler))
        .route("/scrape", post(scrape_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}
