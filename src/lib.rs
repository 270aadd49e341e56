//! Inventory & Sales API library
//!
//! Stock keeping and revenue accounting for named items, served as a JSON
//! HTTP API over SQLite, PostgreSQL or MySQL.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{http::HeaderValue, response::IntoResponse, routing::get, Json, Router};
use sea_orm::DatabaseConnection;
use serde_json::json;
use std::{sync::Arc, time::Instant};
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
};

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub inventory_service: services::InventoryService,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        Self {
            inventory_service: services::InventoryService::new(db.clone()),
            db,
            config,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Versioned JSON API
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .nest("/stocks", handlers::stocks::stock_routes())
        .nest("/sales", handlers::sales::sales_routes())
}

/// Complete application router: API, operational endpoints and middleware
pub fn app_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let body_limit = state.config.max_body_size;

    Router::new()
        .nest("/v1", api_v1_routes())
        .nest("/health", health::health_routes())
        .route("/status", get(api_status))
        .merge(openapi::swagger_ui())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

/// CORS from configured origins, or permissive where configuration allows it
pub fn cors_layer(cfg: &config::AppConfig) -> CorsLayer {
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    match configured_origins {
        Some(origins) => CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any),
        None => {
            // Config validation already refused this outside development
            // unless cors_allow_any_origin is set.
            ::tracing::info!("Using permissive CORS; no explicit origins configured");
            CorsLayer::permissive()
        }
    }
}

async fn api_status() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "git": option_env!("GIT_HASH").unwrap_or("unknown"),
        "build_time": option_env!("BUILD_TIME").unwrap_or("unknown"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub mod prelude {
    pub use crate::config::AppConfig;
    pub use crate::errors::{ErrorResponse, ServiceError};
    pub use crate::services::validation::{ItemName, Price, Quantity};
    pub use crate::services::{InventoryService, SaleCommand, SaleReceipt, StockReceipt};
    pub use crate::{app_router, AppState};
}
