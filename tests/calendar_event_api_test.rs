mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Timelike, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use common::TestApp;
use hub_backend::models::queue_job::{JobKind, JobPayload};

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new().router();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn unknown_template_is_rejected_and_nothing_persists() {
    let t = TestApp::new();
    let creator = t.store.add_user("Front Desk", "staff@example.com", None);
    let app = t.router();

    let (status, body) = send(
        &app,
        "POST",
        "/calendar-event",
        Some(json!({
            "title": "Orientation",
            "description": "Day one",
            "time": Utc::now() + Duration::days(1),
            "templateId": Uuid::new_v4(),
            "createdBy": creator.id,
            "color": "#00f",
            "to": "a@x.com"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("template"));
    assert_eq!(t.store.event_count(), 0);
    assert!(t.queue.jobs().is_empty());
}

#[tokio::test]
async fn unknown_creator_is_rejected() {
    let t = TestApp::new();
    let creator = t.store.add_user("Front Desk", "staff@example.com", None);
    let template = t.store.add_template(&creator);
    let app = t.router();

    let (status, _) = send(
        &app,
        "POST",
        "/calendar-event",
        Some(json!({
            "title": "Orientation",
            "time": Utc::now() + Duration::days(1),
            "templateId": template.id,
            "createdBy": Uuid::new_v4(),
            "color": "#00f",
            "to": "a@x.com"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(t.store.event_count(), 0);
}

#[tokio::test]
async fn event_without_recipient_or_condition_is_rejected() {
    let t = TestApp::new();
    let creator = t.store.add_user("Front Desk", "staff@example.com", None);
    let template = t.store.add_template(&creator);
    let app = t.router();

    let (status, _) = send(
        &app,
        "POST",
        "/calendar-event",
        Some(json!({
            "title": "Orientation",
            "time": Utc::now() + Duration::days(1),
            "templateId": template.id,
            "createdBy": creator.id,
            "color": "#00f"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn single_recipient_event_schedules_one_send_and_skips_resolver() {
    let t = TestApp::new();
    let creator = t.store.add_user("Front Desk", "staff@example.com", None);
    let template = t.store.add_template(&creator);
    let app = t.router();
    let fire_at = (Utc::now() + Duration::days(1)).with_nanosecond(0).unwrap();

    let (status, body) = send(
        &app,
        "POST",
        "/calendar-event",
        Some(json!({
            "title": "Orientation",
            "description": "Day one",
            "time": fire_at,
            "templateId": template.id,
            "createdBy": creator.id,
            "color": "#00f",
            "to": "a@x.com",
            "condition": {"batches": ["2024"], "sections": [], "course": null, "tags": []}
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "PENDING");
    assert_eq!(body["emailTemplate"]["subject"], "Orientation");
    assert_eq!(body["createdBy"]["name"], "Front Desk");

    let jobs = t.queue.jobs();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].kind, JobKind::SendNow);
    assert_eq!(jobs[0].scheduled_at, fire_at);
    match &jobs[0].payload {
        JobPayload::SendNow(mail) => {
            assert_eq!(mail.email, "a@x.com");
            assert_eq!(mail.author, "Front Desk");
            assert_eq!(mail.event_id.map(|id| id.to_string()), body["id"].as_str().map(str::to_string));
        }
        other => panic!("unexpected payload {:?}", other),
    }
    assert_eq!(t.store.resolver_calls(), 0);
}

#[tokio::test]
async fn list_update_and_delete_leave_queued_delivery_alone() {
    let t = TestApp::new();
    let creator = t.store.add_user("Front Desk", "staff@example.com", None);
    let template = t.store.add_template(&creator);
    let other_template = t.store.add_template(&creator);
    let app = t.router();

    let (_, created) = send(
        &app,
        "POST",
        "/calendar-event",
        Some(json!({
            "title": "Orientation",
            "time": Utc::now() + Duration::days(1),
            "templateId": template.id,
            "createdBy": creator.id,
            "color": "#00f",
            "condition": {"batches": ["2024"]}
        })),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();
    let jobs_before = t.queue.jobs();

    let (status, listed) = send(&app, "GET", "/calendar-event", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["createdBy"]["email"], "staff@example.com");

    let (status, updated) = send(
        &app,
        "PATCH",
        &format!("/calendar-event/{}", id),
        Some(json!({"title": "Renamed", "templateId": other_template.id, "createdBy": Uuid::new_v4()})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Renamed");
    assert_eq!(updated["color"], "#00f");
    assert_eq!(updated["templateId"], other_template.id.to_string());
    assert_eq!(updated["createdById"], creator.id.to_string());

    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/calendar-event/{}", id),
        Some(json!({"templateId": Uuid::new_v4()})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, deleted) = send(&app, "DELETE", &format!("/calendar-event/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["title"], "Renamed");

    let (status, _) = send(&app, "DELETE", &format!("/calendar-event/{}", id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(t.queue.jobs(), jobs_before);
}

#[tokio::test]
async fn patching_a_missing_event_is_bad_request() {
    let app = TestApp::new().router();
    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/calendar-event/{}", Uuid::new_v4()),
        Some(json!({"title": "Renamed"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("does not exist"));
}

#[tokio::test]
async fn queue_jobs_can_be_looked_up() {
    let t = TestApp::new();
    let handle = t
        .state
        .mail_service
        .send_otp("a@x.com", "123456")
        .await
        .unwrap();
    let app = t.router();

    let (status, body) = send(&app, "GET", &format!("/queue/jobs/{}", handle.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "SEND_OTP");
    assert_eq!(body["state"], "PENDING");

    let (status, _) = send(&app, "GET", &format!("/queue/jobs/{}", Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_event_body_is_bad_request_with_error_json() {
    let t = TestApp::new();
    let creator = t.store.add_user("Front Desk", "staff@example.com", None);
    let app = t.router();

    let (status, body) = send(
        &app,
        "POST",
        "/calendar-event",
        Some(json!({
            "title": "Orientation",
            "time": Utc::now() + Duration::days(1),
            "createdBy": creator.id,
            "color": "#00f",
            "to": "a@x.com"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("templateId"));

    let (status, body) = send(
        &app,
        "PATCH",
        "/calendar-event/not-a-uuid",
        Some(json!({"title": "Renamed"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, body) = send(&app, "GET", "/queue/jobs/not-a-uuid", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    assert_eq!(t.store.event_count(), 0);
    assert!(t.queue.jobs().is_empty());
}
