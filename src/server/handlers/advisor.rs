use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use crate::advisor::AnalysisOutcome;
use crate::composer::{RebalanceReport, RecommendationResult};
use crate::core::errors::ApiError;
use crate::ranker::CustomerProfile;
use crate::state::AppState;

pub async fn recommend_etf(
    State(state): State<Arc<AppState>>,
    Json(profile): Json<CustomerProfile>,
) -> Result<Json<RecommendationResult>, ApiError> {
    tracing::info!("recommendation request for customer {}", profile.customer_id);
    Ok(Json(state.advisor.recommend(&profile).await))
}

pub async fn rebalance_report(
    State(state): State<Arc<AppState>>,
    Json(profile): Json<CustomerProfile>,
) -> Result<Json<RebalanceReport>, ApiError> {
    if !profile.has_holdings() {
        return Err(ApiError::BadRequest(
            "rebalance report requires at least one held ETF".to_string(),
        ));
    }
    tracing::info!("rebalance report for customer {}", profile.customer_id);
    Ok(Json(state.advisor.rebalance_report(&profile).await))
}

/// Routes on holdings: rebalance report for holders, recommendation
/// otherwise.
pub async fn customer_etf_analysis(
    State(state): State<Arc<AppState>>,
    Json(profile): Json<CustomerProfile>,
) -> Result<Json<AnalysisOutcome>, ApiError> {
    tracing::info!("analysis request for customer {}", profile.customer_id);
    Ok(Json(state.advisor.analyze(&profile).await))
}
