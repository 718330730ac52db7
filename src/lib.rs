//! ESHOP API Library
//!
//! E-commerce backend: CRUD over users, categories, products and orders on
//! a relational store, plus a Redis-backed per-user shopping cart.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod schemas;
pub mod services;

use axum::Router;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: services::AppServices,
    pub redis: Arc<redis::Client>,
}

/// Assembles the full router: root + health probes + the `/api/v1`
/// surface. Middleware layers (CORS, tracing, compression) are applied by
/// the caller.
pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(handlers::health::health_routes())
        .nest("/api/v1", handlers::api_v1_routes())
        .with_state(state)
}
