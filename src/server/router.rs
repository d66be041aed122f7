use std::sync::Arc;

use axum::http::{header, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::handlers::{advisor, health, knowledge};
use crate::state::AppState;

/// Builds the application router: health probes, the advisory endpoints,
/// the manual knowledge refresh, and the metrics snapshot.
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health::health))
        .route("/health/llm", get(health::llm_health))
        .route("/api/metrics", get(health::metrics))
        .route("/api/v1/recommend-etf", post(advisor::recommend_etf))
        .route("/api/v1/rebalance-report", post(advisor::rebalance_report))
        .route(
            "/api/v1/customer-etf-analysis",
            post(advisor::customer_etf_analysis),
        )
        .route("/api/v1/refresh-knowledge", post(knowledge::refresh_knowledge))
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
