//! # Ferry API
//!
//! HTTP surface for the backfill work queue and status engine.
//!
//! Workers drive the lease lifecycle over this API (acquire, renew with
//! progress, complete) while operator tooling reads queue and deep shard
//! status. Error kinds map onto distinct status codes so callers can react
//! without parsing messages:
//!
//! | kind               | status |
//! |--------------------|--------|
//! | NotFound           | 404    |
//! | AlreadyExists      | 409    |
//! | LeaseNotOwned      | 409    |
//! | LeaseExpired       | 410    |
//! | Validation         | 422    |
//! | StatusUnavailable  | 503    |

pub mod error;
pub mod handlers;
pub mod sessions;
pub mod types;

pub use error::ApiError;

use ferry_coordinator::{LeaseCoordinator, ShardStatusDeriver};
use ferry_storage::SessionStore;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<LeaseCoordinator>,
    pub sessions: Arc<dyn SessionStore>,
    /// Query-derived status backend; absent in lease-table-only deployments.
    pub deriver: Option<Arc<ShardStatusDeriver>>,
}

/// Build the API router.
pub fn router(state: AppState) -> axum::Router {
    use axum::routing::{get, post, put};

    axum::Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/sessions",
            post(sessions::create_session).get(sessions::list_sessions),
        )
        .route(
            "/sessions/:name",
            get(sessions::get_session).delete(sessions::delete_session),
        )
        .route(
            "/backfill/work-items",
            post(handlers::create_work_item)
                .get(handlers::list_work_items)
                .delete(handlers::delete_work_items),
        )
        .route(
            "/backfill/work-items/batch",
            post(handlers::create_work_items_batch),
        )
        .route(
            "/backfill/work-items/acquire",
            get(handlers::acquire_work_item),
        )
        .route("/backfill/work-items/status", get(handlers::queue_status))
        .route(
            "/backfill/work-items/cleanup",
            post(handlers::cleanup_expired_leases),
        )
        .route("/backfill/work-items/:id", get(handlers::get_work_item))
        .route("/backfill/work-items/:id/lease", put(handlers::renew_lease))
        .route(
            "/backfill/work-items/:id/complete",
            post(handlers::complete_work_item),
        )
        .route("/backfill/status", get(handlers::deep_status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve the API until the process is stopped.
pub async fn serve(state: AppState, port: u16) -> std::io::Result<()> {
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "ferry api listening");
    axum::serve(listener, router(state)).await
}
