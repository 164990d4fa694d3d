use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::workflows::intake::domain::ServiceKind;
use crate::workflows::intake::router::{intake_router, CLIENT_HEADER, STAFF_HEADER};

fn router() -> (
    axum::Router,
    Arc<crate::workflows::intake::repository::InMemoryClientRepository>,
    Arc<
        crate::workflows::intake::service::IntakeService<
            crate::workflows::intake::repository::InMemoryClientRepository,
            RecordingDispatcher,
        >,
    >,
) {
    let (service, repository, _) = build_service();
    let service = Arc::new(service);
    (intake_router(service.clone()), repository, service)
}

fn submit_body() -> String {
    json!({
        "form": {
            "service": "residence",
            "current_country": "Algeria",
            "passport_number": "P-4418822",
        },
        "attachment_ref": "uploads/passport-scan.pdf",
    })
    .to_string()
}

#[tokio::test]
async fn unauthenticated_requests_are_refused_up_front() {
    let (app, _, _) = router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/clients/c-100/services/residence")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], "not permitted");
}

#[tokio::test]
async fn owner_submission_is_accepted_with_a_status_view() {
    let (app, _, _) = router();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/clients/c-100/services/residence/submission")
                .header(CLIENT_HEADER, "c-100")
                .header("content-type", "application/json")
                .body(Body::from(submit_body()))
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let body = read_json_body(response).await;
    assert_eq!(body["service"], "residence");
    assert_eq!(body["status"], "pending");
    assert_eq!(body["submitted"], true);
}

#[tokio::test]
async fn clients_get_an_opaque_forbidden_on_review_endpoints() {
    let (app, _, service) = router();
    submit_pending(&service, &residence_form(), Utc::now());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/clients/c-100/services/residence/validation")
                .header(CLIENT_HEADER, "c-100")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = read_json_body(response).await;
    assert_eq!(body["error"], "not permitted");
}

#[tokio::test]
async fn staff_validation_returns_the_updated_view() {
    let (app, _, service) = router();
    submit_pending(&service, &residence_form(), Utc::now());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/clients/c-100/services/residence/validation")
                .header(STAFF_HEADER, "agent-7")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["status"], "validated");
    assert!(body.get("rejected_at").is_none());
}

#[tokio::test]
async fn rejection_requires_a_reason_field() {
    let (app, _, service) = router();
    submit_pending(&service, &residence_form(), Utc::now());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/clients/c-100/services/residence/rejection")
                .header(STAFF_HEADER, "agent-7")
                .header("content-type", "application/json")
                .body(Body::from(json!({ "reason": "  " }).to_string()))
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["field"], "reason");
}

#[tokio::test]
async fn resubmission_during_cooldown_carries_the_countdown() {
    let (app, _, service) = router();
    let t0 = Utc::now() - Duration::hours(2);
    submit_pending(&service, &residence_form(), t0);
    service
        .reject(
            &staff(),
            &client_id(),
            ServiceKind::Residence,
            "incomplete",
            t0 + Duration::hours(1),
        )
        .expect("rejection succeeds");

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/clients/c-100/services/residence/submission")
                .header(CLIENT_HEADER, "c-100")
                .header("content-type", "application/json")
                .body(Body::from(submit_body()))
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = read_json_body(response).await;
    let hours = body["remaining_hours"].as_i64().expect("countdown present");
    assert!((22..=23).contains(&hours), "about 23h left, saw {hours}");
}

#[tokio::test]
async fn form_must_match_the_addressed_track() {
    let (app, _, _) = router();

    let body = json!({
        "form": {
            "service": "partner",
            "agency_name": "Horizon Voyages",
            "registration_number": "RC-2207-B",
            "city": "Oran",
        },
    })
    .to_string();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/clients/c-100/services/residence/submission")
                .header(CLIENT_HEADER, "c-100")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body["field"], "form");
}

#[tokio::test]
async fn unknown_service_tracks_are_not_found() {
    let (app, _, _) = router();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/clients/c-100/services/citizenship")
                .header(CLIENT_HEADER, "c-100")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn repository_outage_is_a_server_error() {
    let service = Arc::new(crate::workflows::intake::service::IntakeService::new(
        Arc::new(UnavailableRepository),
        Arc::new(RecordingDispatcher::default()),
    ));
    let app = intake_router(service);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/clients/c-100/services/residence")
                .header(CLIENT_HEADER, "c-100")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
