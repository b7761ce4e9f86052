use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::domain::{ActorRole, RentalRequest, RentalSubmission, RequestId};
use super::lifecycle::{Action, PaymentAcknowledgment, TransitionError, TransitionPayload};
use super::repository::{DocumentVerifier, NotificationPublisher, RentalRepository, RepositoryError};
use super::service::{RentalService, RentalServiceError};
use super::status::project_status;

/// Router builder exposing HTTP endpoints for the rental lifecycle.
pub fn rental_router<R, N, D>(service: Arc<RentalService<R, N, D>>) -> Router
where
    R: RentalRepository + 'static,
    N: NotificationPublisher + 'static,
    D: DocumentVerifier + 'static,
{
    Router::new()
        .route(
            "/api/v1/rentals",
            post(submit_handler::<R, N, D>).get(list_handler::<R, N, D>),
        )
        .route("/api/v1/rentals/:request_id", get(detail_handler::<R, N, D>))
        .route(
            "/api/v1/rentals/:request_id/actions/:role",
            get(menu_handler::<R, N, D>),
        )
        .route(
            "/api/v1/rentals/:request_id/actions",
            post(action_handler::<R, N, D>),
        )
        .route(
            "/api/v1/rentals/:request_id/payment",
            post(payment_handler::<R, N, D>),
        )
        .with_state(service)
}

/// Wire body for a transition attempt.
#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub action: Action,
    pub actor: ActorRole,
    #[serde(default)]
    pub payload: TransitionPayload,
}

/// Sanitized representation of a request's exposed state, shared by
/// every endpoint that returns one.
#[derive(Debug, Serialize)]
pub struct RequestView {
    pub request_id: RequestId,
    pub status: &'static str,
    pub category: &'static str,
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_due: Option<rust_decimal::Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub payment_frozen: bool,
}

impl RequestView {
    fn of(request: &RentalRequest) -> Self {
        let projection = project_status(request);
        Self {
            request_id: request.id.clone(),
            status: request.status.label(),
            category: projection.category.display_name(),
            label: projection.label,
            amount_due: projection.amount_due,
            rejection_reason: request.rejection_reason.clone(),
            payment_frozen: request.frozen_breakdown.is_some(),
        }
    }
}

pub(crate) async fn submit_handler<R, N, D>(
    State(service): State<Arc<RentalService<R, N, D>>>,
    axum::Json(submission): axum::Json<RentalSubmission>,
) -> Response
where
    R: RentalRepository + 'static,
    N: NotificationPublisher + 'static,
    D: DocumentVerifier + 'static,
{
    match service.submit(submission) {
        Ok(request) => {
            (StatusCode::ACCEPTED, axum::Json(RequestView::of(&request))).into_response()
        }
        Err(error) => error_response(error),
    }
}

/// Cap on the operational listing; terminal records never appear in it.
const ACTIVE_LISTING_LIMIT: usize = 100;

pub(crate) async fn list_handler<R, N, D>(
    State(service): State<Arc<RentalService<R, N, D>>>,
) -> Response
where
    R: RentalRepository + 'static,
    N: NotificationPublisher + 'static,
    D: DocumentVerifier + 'static,
{
    match service.active(ACTIVE_LISTING_LIMIT) {
        Ok(requests) => {
            let views: Vec<RequestView> = requests.iter().map(RequestView::of).collect();
            (StatusCode::OK, axum::Json(views)).into_response()
        }
        Err(error) => error_response(error),
    }
}

pub(crate) async fn detail_handler<R, N, D>(
    State(service): State<Arc<RentalService<R, N, D>>>,
    Path(request_id): Path<String>,
) -> Response
where
    R: RentalRepository + 'static,
    N: NotificationPublisher + 'static,
    D: DocumentVerifier + 'static,
{
    match service.get(&RequestId(request_id)) {
        Ok(request) => (StatusCode::OK, axum::Json(RequestView::of(&request))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn menu_handler<R, N, D>(
    State(service): State<Arc<RentalService<R, N, D>>>,
    Path((request_id, role)): Path<(String, String)>,
) -> Response
where
    R: RentalRepository + 'static,
    N: NotificationPublisher + 'static,
    D: DocumentVerifier + 'static,
{
    let Some(viewer) = parse_role(&role) else {
        let payload = json!({ "error": format!("unknown viewer role '{role}'") });
        return (StatusCode::BAD_REQUEST, axum::Json(payload)).into_response();
    };

    match service.menu(&RequestId(request_id), viewer) {
        Ok(menu) => (StatusCode::OK, axum::Json(menu)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn action_handler<R, N, D>(
    State(service): State<Arc<RentalService<R, N, D>>>,
    Path(request_id): Path<String>,
    axum::Json(body): axum::Json<ActionRequest>,
) -> Response
where
    R: RentalRepository + 'static,
    N: NotificationPublisher + 'static,
    D: DocumentVerifier + 'static,
{
    let id = RequestId(request_id);
    match service.apply(&id, body.action, body.actor, &body.payload) {
        Ok(request) => (StatusCode::OK, axum::Json(RequestView::of(&request))).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn payment_handler<R, N, D>(
    State(service): State<Arc<RentalService<R, N, D>>>,
    Path(request_id): Path<String>,
    axum::Json(acknowledgment): axum::Json<PaymentAcknowledgment>,
) -> Response
where
    R: RentalRepository + 'static,
    N: NotificationPublisher + 'static,
    D: DocumentVerifier + 'static,
{
    let id = RequestId(request_id);
    match service.record_payment(&id, acknowledgment) {
        Ok(request) => (StatusCode::OK, axum::Json(RequestView::of(&request))).into_response(),
        Err(error) => error_response(error),
    }
}

fn parse_role(raw: &str) -> Option<ActorRole> {
    match raw {
        "renter" => Some(ActorRole::Renter),
        "owner" => Some(ActorRole::Owner),
        "scheduler" => Some(ActorRole::Scheduler),
        "payment_gateway" => Some(ActorRole::PaymentGateway),
        _ => None,
    }
}

/// Map service error tags to HTTP codes. The core never writes
/// user-facing copy; these payloads carry the classification and the
/// typed details.
fn error_response(error: RentalServiceError) -> Response {
    match error {
        RentalServiceError::Validation(validation) => {
            let payload = json!({
                "error": "validation_failed",
                "violations": validation.violations,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        RentalServiceError::Transition(transition) => {
            let (status, tag) = match &transition {
                TransitionError::Illegal { .. } => (StatusCode::CONFLICT, "illegal_transition"),
                TransitionError::StaleState { .. } => (StatusCode::CONFLICT, "stale_state"),
                TransitionError::AcknowledgmentMismatch { .. } => {
                    (StatusCode::CONFLICT, "acknowledgment_mismatch")
                }
                TransitionError::MissingReason | TransitionError::MissingAcknowledgment => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "missing_input")
                }
                TransitionError::Pricing(_) => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "validation_failed")
                }
            };
            let payload = json!({
                "error": tag,
                "detail": transition.to_string(),
            });
            (status, axum::Json(payload)).into_response()
        }
        RentalServiceError::Repository(RepositoryError::NotFound) => {
            let payload = json!({ "error": "not_found" });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        RentalServiceError::Repository(RepositoryError::Conflict) => {
            let payload = json!({ "error": "conflict" });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        RentalServiceError::Repository(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
