//! HTTP API Layer
//!
//! This crate exposes the kitty ledger over REST using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: Request handlers for accounts, entries and bills
//! - **Middleware**: Tracing and audit logging
//! - **Auth**: The delete-password capability check
//! - **DTOs**: Request/Response data transfer objects
//! - **Error Handling**: Consistent error responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let service = LedgerService::new(Arc::new(InMemoryLedgerStore::new()));
//! let app = create_router(service, config);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;
pub mod extract;

use axum::{
    Router,
    routing::{get, post},
    middleware as axum_middleware,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tower_http::cors::{CorsLayer, Any};

use domain_ledger::LedgerService;

use crate::config::ApiConfig;
use crate::middleware::audit_middleware;
use crate::handlers::{accounts, bills, entries, health};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub service: LedgerService,
    pub config: ApiConfig,
}

/// Creates the main API router
///
/// # Arguments
///
/// * `service` - Ledger service over the chosen store
/// * `config` - API configuration
pub fn create_router(service: LedgerService, config: ApiConfig) -> Router {
    let state = AppState { service, config };

    // Public routes
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let account_routes = Router::new()
        .route("/", post(accounts::create_account).get(accounts::list_accounts))
        .route(
            "/:id",
            get(accounts::get_account)
                .put(accounts::rename_account)
                .delete(accounts::delete_account),
        )
        .route("/:id/credit", post(accounts::credit))
        .route("/:id/debit", post(accounts::debit))
        .route("/:id/entries", get(accounts::list_account_entries));

    let bill_routes = Router::new()
        .route("/", post(bills::settle_bill).get(bills::find_bill))
        .route("/tax-preview", post(bills::tax_preview))
        .route("/:settlement_id", get(bills::get_settlement));

    let api_routes = Router::new()
        .nest("/accounts", account_routes)
        .nest("/bills", bill_routes)
        .route("/entries", get(entries::list_entries))
        .route("/reconcile", get(bills::reconcile))
        .layer(axum_middleware::from_fn(audit_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}
