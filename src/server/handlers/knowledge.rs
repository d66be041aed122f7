use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::scheduler::run_update_cycle;
use crate::state::AppState;

/// Runs one incremental update cycle outside the daily schedule, e.g.
/// right after new documents were dropped into the corpus.
pub async fn refresh_knowledge(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let report = run_update_cycle(
        state.index.as_ref(),
        &state.ledger,
        state.docs.as_ref(),
    )
    .await?;

    let status = if report.is_partial() {
        "partial"
    } else {
        "success"
    };

    Ok(Json(json!({
        "status": status,
        "sources_seen": report.sources_seen,
        "sources_updated": report.sources_updated,
        "chunks_added": report.chunks_added,
        "failures": report
            .failures
            .iter()
            .map(|(source, reason)| json!({ "source": source, "reason": reason }))
            .collect::<Vec<_>>(),
    })))
}
