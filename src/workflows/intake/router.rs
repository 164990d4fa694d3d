use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::auth::{AuthorizationError, Caller, StaffId};
use super::domain::{ClientId, ServiceForm, ServiceKind};
use super::repository::{ClientRepository, NotificationDispatcher, RepositoryError};
use super::service::{IntakeError, IntakeService};

/// Header carrying the authenticated client identity, as issued by the
/// session boundary in front of this service.
pub const CLIENT_HEADER: &str = "x-client-id";
/// Header carrying an authenticated staff identity.
pub const STAFF_HEADER: &str = "x-staff-id";

/// Router builder exposing the per-service status surface.
pub fn intake_router<R, N>(service: Arc<IntakeService<R, N>>) -> Router
where
    R: ClientRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    Router::new()
        .route(
            "/api/v1/clients/:client_id/services/:service",
            get(status_handler::<R, N>),
        )
        .route(
            "/api/v1/clients/:client_id/services/:service/submission",
            post(submit_handler::<R, N>),
        )
        .route(
            "/api/v1/clients/:client_id/services/:service/validation",
            post(validate_handler::<R, N>),
        )
        .route(
            "/api/v1/clients/:client_id/services/:service/rejection",
            post(reject_handler::<R, N>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitRequest {
    form: ServiceForm,
    #[serde(default)]
    attachment_ref: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RejectRequest {
    reason: String,
}

pub(crate) async fn status_handler<R, N>(
    State(service): State<Arc<IntakeService<R, N>>>,
    Path((client_id, service_kind)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response
where
    R: ClientRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    let (caller, client_id, kind) = match request_context(&headers, client_id, &service_kind) {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    match service.status_view(&caller, &client_id, kind, Utc::now()) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn submit_handler<R, N>(
    State(service): State<Arc<IntakeService<R, N>>>,
    Path((client_id, service_kind)): Path<(String, String)>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<SubmitRequest>,
) -> Response
where
    R: ClientRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    let (caller, client_id, kind) = match request_context(&headers, client_id, &service_kind) {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    if request.form.kind() != kind {
        let payload = json!({
            "error": "form payload does not match the addressed service track",
            "field": "form",
        });
        return (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response();
    }

    let now = Utc::now();
    match service.submit(&caller, &client_id, &request.form, request.attachment_ref, now) {
        Ok(record) => {
            let view = service.view_of(&record, kind, now);
            (StatusCode::ACCEPTED, axum::Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn validate_handler<R, N>(
    State(service): State<Arc<IntakeService<R, N>>>,
    Path((client_id, service_kind)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response
where
    R: ClientRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    let (caller, client_id, kind) = match request_context(&headers, client_id, &service_kind) {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    let now = Utc::now();
    match service.validate(&caller, &client_id, kind) {
        Ok(record) => {
            let view = service.view_of(&record, kind, now);
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reject_handler<R, N>(
    State(service): State<Arc<IntakeService<R, N>>>,
    Path((client_id, service_kind)): Path<(String, String)>,
    headers: HeaderMap,
    axum::Json(request): axum::Json<RejectRequest>,
) -> Response
where
    R: ClientRepository + 'static,
    N: NotificationDispatcher + 'static,
{
    let (caller, client_id, kind) = match request_context(&headers, client_id, &service_kind) {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    let now = Utc::now();
    match service.reject(&caller, &client_id, kind, &request.reason, now) {
        Ok(record) => {
            let view = service.view_of(&record, kind, now);
            (StatusCode::OK, axum::Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

/// Resolve the caller identity and the addressed record, refusing
/// unauthenticated requests before any intake logic runs.
fn request_context(
    headers: &HeaderMap,
    client_id: String,
    service_kind: &str,
) -> Result<(Caller, ClientId, ServiceKind), Response> {
    let caller = caller_from_headers(headers).map_err(|err| {
        let payload = json!({ "error": err.to_string() });
        (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response()
    })?;

    let kind = ServiceKind::from_str(service_kind).map_err(|err| {
        let payload = json!({ "error": err.to_string() });
        (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
    })?;

    Ok((caller, ClientId(client_id), kind))
}

/// Map session headers to a caller identity. A staff header outranks a
/// client header so staff consoles can browse on a client's behalf.
pub fn caller_from_headers(headers: &HeaderMap) -> Result<Caller, AuthorizationError> {
    if let Some(value) = headers.get(STAFF_HEADER).and_then(|v| v.to_str().ok()) {
        if !value.trim().is_empty() {
            return Ok(Caller::Staff(StaffId(value.trim().to_string())));
        }
    }
    if let Some(value) = headers.get(CLIENT_HEADER).and_then(|v| v.to_str().ok()) {
        if !value.trim().is_empty() {
            return Ok(Caller::Client(ClientId(value.trim().to_string())));
        }
    }
    Err(AuthorizationError::Unauthenticated)
}

fn error_response(err: IntakeError) -> Response {
    match err {
        IntakeError::Authorization(auth) => {
            let status = match auth {
                AuthorizationError::Unauthenticated => StatusCode::UNAUTHORIZED,
                AuthorizationError::NotOwner | AuthorizationError::StaffRequired => {
                    StatusCode::FORBIDDEN
                }
            };
            // One opaque body for every denial; no resource details leak.
            let payload = json!({ "error": auth.to_string() });
            (status, axum::Json(payload)).into_response()
        }
        IntakeError::CooldownActive(window) => {
            let payload = json!({
                "error": IntakeError::CooldownActive(window).to_string(),
                "remaining_hours": window.remaining_hours(),
                "remaining_minutes": window.remaining_minutes(),
            });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        IntakeError::InvalidTransition { .. } => {
            let payload = json!({ "error": err.to_string() });
            (StatusCode::CONFLICT, axum::Json(payload)).into_response()
        }
        IntakeError::Validation(validation) => {
            let payload = json!({
                "error": validation.to_string(),
                "field": validation.field,
            });
            (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(payload)).into_response()
        }
        IntakeError::Repository(RepositoryError::NotFound) => {
            let payload = json!({ "error": "client not found" });
            (StatusCode::NOT_FOUND, axum::Json(payload)).into_response()
        }
        IntakeError::Repository(other) => {
            let payload = json!({ "error": other.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}
