pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod money;
pub mod pricing;
pub mod refunds;
pub mod validation;

use std::any::Any as PanicPayload;

use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
    routing::{get, patch, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use error::ApiError;
use ledger::{
    OrderRefundSummary, RefundLedger, ReturnRecord, ReturnStatus, UpdateReturnStatusRequest,
};
use metrics::{EngineMetrics, MetricsSummary};
use pricing::{LineTotals, OrderDraft, OrderLine, OrderTotals};
use refunds::{
    AllocateRefundRequest, ItemRefund, PostedOrder, RefundResult, RefundService, ReturnLine,
    ReturnSubmission,
};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        pricing::handlers::compute_totals_handler,
        refunds::handlers::allocate_refund_handler,
        refunds::handlers::submit_return_handler,
        refunds::handlers::list_returns_handler,
        refunds::handlers::update_return_status_handler,
        get_metrics,
    ),
    components(
        schemas(
            OrderLine, LineTotals, OrderTotals, OrderDraft,
            PostedOrder, ReturnLine, ItemRefund, RefundResult,
            AllocateRefundRequest, ReturnSubmission,
            ReturnStatus, ReturnRecord, OrderRefundSummary, UpdateReturnStatusRequest,
            MetricsSummary
        )
    ),
    tags(
        (name = "pricing", description = "Live order totals"),
        (name = "refunds", description = "Stateless refund allocation"),
        (name = "returns", description = "Return events recorded per order"),
        (name = "metrics", description = "Engine performance counters")
    ),
    info(
        title = "Order Money API",
        version = "1.0.0",
        description = "Order totals and refund allocation for the point of sale"
    )
)]
pub struct ApiDoc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub refund_service: RefundService,
    pub metrics: EngineMetrics,
}

impl AppState {
    pub fn new(metrics: EngineMetrics) -> Self {
        Self {
            refund_service: RefundService::new(RefundLedger::new(), metrics.clone()),
            metrics,
        }
    }
}

/// Handler for GET /api/metrics
#[utoipa::path(
    get,
    path = "/api/metrics",
    responses(
        (status = 200, description = "Current engine metrics", body = MetricsSummary)
    ),
    tag = "metrics"
)]
pub async fn get_metrics(State(state): State<AppState>) -> Json<MetricsSummary> {
    Json(state.metrics.summary())
}

/// Turns a handler panic into a logged 500 with the usual error body
fn handle_panic(payload: Box<dyn PanicPayload + Send + 'static>) -> Response {
    let detail = if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic payload".to_string()
    };

    ApiError::InternalError(format!("handler panicked: {}", detail)).into_response()
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds CORS, tracing and
/// panic-recovery middleware
pub fn create_router(state: AppState) -> Router {
    // Configure CORS to allow all origins, methods, and headers
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/pricing/totals", post(pricing::compute_totals_handler))
        .route("/api/refunds/allocate", post(refunds::allocate_refund_handler))
        .route(
            "/api/orders/:order_id/returns",
            post(refunds::submit_return_handler).get(refunds::list_returns_handler),
        )
        .route(
            "/api/returns/:return_id/status",
            patch(refunds::update_return_status_handler),
        )
        .route("/api/metrics", get(get_metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(cors),
        )
        .with_state(state)
}
