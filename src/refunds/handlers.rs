// HTTP handlers for refund and return endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::error::ApiError;
use crate::ledger::{OrderRefundSummary, ReturnRecord, UpdateReturnStatusRequest};
use crate::refunds::{AllocateRefundRequest, RefundResult, ReturnSubmission};
use crate::AppState;

/// Handler for POST /api/refunds/allocate
/// Allocates a refund for a return without recording it
#[utoipa::path(
    post,
    path = "/api/refunds/allocate",
    request_body = AllocateRefundRequest,
    responses(
        (status = 200, description = "Refund allocated across the returned lines", body = RefundResult),
        (status = 400, description = "Invalid order or return lines", body = String, example = json!({"errorCode": "VALIDATION_ERROR"}))
    ),
    tag = "refunds"
)]
pub async fn allocate_refund_handler(
    State(state): State<AppState>,
    Json(request): Json<AllocateRefundRequest>,
) -> Result<Json<RefundResult>, ApiError> {
    request.validate()?;

    let result = state.refund_service.quote(&request);

    tracing::debug!(
        "Quoted refund {} for {} return lines",
        result.total_refund,
        request.return_lines.len()
    );

    Ok(Json(result))
}

/// Handler for POST /api/orders/:order_id/returns
/// Allocates a return against the order's refund history and records it as pending
#[utoipa::path(
    post,
    path = "/api/orders/{order_id}/returns",
    params(
        ("order_id" = Uuid, Path, description = "Order ID")
    ),
    request_body = ReturnSubmission,
    responses(
        (status = 201, description = "Return recorded as pending", body = ReturnRecord),
        (status = 400, description = "Invalid order or return lines", body = String, example = json!({"errorCode": "VALIDATION_ERROR"}))
    ),
    tag = "returns"
)]
pub async fn submit_return_handler(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(submission): Json<ReturnSubmission>,
) -> Result<(StatusCode, Json<ReturnRecord>), ApiError> {
    submission.validate()?;

    let record = state.refund_service.submit_return(order_id, submission).await;

    Ok((StatusCode::CREATED, Json(record)))
}

/// Handler for GET /api/orders/:order_id/returns
/// Lists an order's returns with the completed refund total
#[utoipa::path(
    get,
    path = "/api/orders/{order_id}/returns",
    params(
        ("order_id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Returns of the order", body = OrderRefundSummary)
    ),
    tag = "returns"
)]
pub async fn list_returns_handler(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> Json<OrderRefundSummary> {
    Json(state.refund_service.order_summary(order_id).await)
}

/// Handler for PATCH /api/returns/:return_id/status
/// Completes or fails a pending return
#[utoipa::path(
    patch,
    path = "/api/returns/{return_id}/status",
    params(
        ("return_id" = Uuid, Path, description = "Return ID")
    ),
    request_body = UpdateReturnStatusRequest,
    responses(
        (status = 200, description = "Return status updated", body = ReturnRecord),
        (status = 404, description = "Return not found", body = String, example = json!({"errorCode": "NOT_FOUND"})),
        (status = 409, description = "Transition not allowed or refund exceeds the order total", body = String, example = json!({"errorCode": "CONFLICT"}))
    ),
    tag = "returns"
)]
pub async fn update_return_status_handler(
    State(state): State<AppState>,
    Path(return_id): Path<Uuid>,
    Json(request): Json<UpdateReturnStatusRequest>,
) -> Result<Json<ReturnRecord>, ApiError> {
    let record = state
        .refund_service
        .update_status(return_id, request.status)
        .await?;

    Ok(Json(record))
}
