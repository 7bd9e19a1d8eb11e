// HTTP handlers for the pricing endpoint

use axum::{extract::State, Json};
use validator::Validate;

use crate::error::ApiError;
use crate::pricing::{OrderDraft, OrderTotals};
use crate::AppState;

/// Handler for POST /api/pricing/totals
/// Computes the live totals breakdown for an order draft
#[utoipa::path(
    post,
    path = "/api/pricing/totals",
    request_body = OrderDraft,
    responses(
        (status = 200, description = "Totals for the draft", body = OrderTotals),
        (status = 400, description = "Invalid draft", body = String, example = json!({"errorCode": "VALIDATION_ERROR"}))
    ),
    tag = "pricing"
)]
pub async fn compute_totals_handler(
    State(state): State<AppState>,
    Json(draft): Json<OrderDraft>,
) -> Result<Json<OrderTotals>, ApiError> {
    draft.validate()?;

    let totals = {
        let _timer = state.metrics.start_totals_computation();
        draft.totals()
    };

    tracing::debug!(
        "Computed totals for {} lines: final {}, balance {}",
        totals.lines.len(),
        totals.final_amount,
        totals.balance_due
    );

    Ok(Json(totals))
}
