use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use rentflow::error::AppError;
use rentflow::workflows::rental::{
    derive_breakdown, rental_router, DocumentVerifier, NotificationPublisher, PricingBreakdown,
    RentalRepository, RentalService, RentalServiceError,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct QuoteRequest {
    pub(crate) base_daily_rate: Decimal,
    pub(crate) duration_days: u32,
    #[serde(default)]
    pub(crate) deposit_percent: Option<Decimal>,
}

pub(crate) fn with_rental_routes<R, N, D>(service: Arc<RentalService<R, N, D>>) -> axum::Router
where
    R: RentalRepository + 'static,
    N: NotificationPublisher + 'static,
    D: DocumentVerifier + 'static,
{
    rental_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/pricing/quote", axum::routing::post(quote_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Stateless quote derivation for listing and checkout previews. The
/// same derivation runs at payment time against the stored request, so
/// a preview can never disagree with the amount later charged.
pub(crate) async fn quote_endpoint(
    Json(payload): Json<QuoteRequest>,
) -> Result<Json<PricingBreakdown>, AppError> {
    let QuoteRequest {
        base_daily_rate,
        duration_days,
        deposit_percent,
    } = payload;

    let breakdown = derive_breakdown(base_daily_rate, duration_days, deposit_percent)
        .map_err(RentalServiceError::Validation)?;
    Ok(Json(breakdown))
}
