//! Packhouse QC
//!
//! A small record-keeping service for produce crate inspections: staff log
//! crates (farm, commodity, grade, weight, date received), browse and filter
//! them on a dashboard, export everything as CSV, and read/write records
//! through a minimal JSON API.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod services;

use axum::{routing::get, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Shared application state: an explicit store handle plus the services
/// built over it. No ambient singletons.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let services = handlers::AppServices::new(db.clone());
        Self {
            db,
            config,
            services,
        }
    }
}

/// Full application router: HTML pages, CSV export, JSON API and health.
pub fn app_router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::pages::index))
        .route("/dashboard", get(handlers::pages::dashboard))
        .route(
            "/add",
            get(handlers::pages::add_form).post(handlers::pages::add_crate),
        )
        .route("/crate/:id", get(handlers::pages::crate_detail))
        .route("/export/csv", get(handlers::export::export_csv))
        .route(
            "/api/crates",
            get(handlers::crates_api::list_crates).post(handlers::crates_api::create_crate),
        )
        .route("/health", get(handlers::health::health_check))
}
