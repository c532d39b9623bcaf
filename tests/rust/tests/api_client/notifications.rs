//! Tests for NotificationApiClient against a mock HTTP server
//!
//! Validates request shape (paths, query, bearer token), response decoding
//! and error mapping.

use chrono::{TimeZone, Timelike, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use labelpulse_client::{ApiConfig, ApiError, NotificationApiClient};
use labelpulse_core::{NotificationRepository, NotificationType};
use tests::fixtures::notification_json;

fn client_for(server: &MockServer) -> NotificationApiClient {
    let config = ApiConfig::new(format!("{}/api/v1", server.uri())).with_token("test-token");
    NotificationApiClient::new(config).unwrap()
}

// =============================================================================
// Reads
// =============================================================================

#[tokio::test]
async fn fetch_unread_count_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/notifications/unread-count"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unread_count": 12 })))
        .expect(1)
        .mount(&server)
        .await;

    let count = client_for(&server).fetch_unread_count().await.unwrap();
    assert_eq!(count.unread_count, 12);
}

#[tokio::test]
async fn fetch_notifications_passes_limit_and_decodes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/notifications"))
        .and(query_param("limit", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            notification_json("n1", "task_assigned", false),
            notification_json("n2", "qa_approved", true),
            notification_json("n3", "something_new", false),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let notifications = client_for(&server).fetch_notifications(50).await.unwrap();

    assert_eq!(notifications.len(), 3);
    assert_eq!(notifications[0].kind, NotificationType::TaskAssigned);
    assert_eq!(notifications[0].project_id.as_deref(), Some("proj-3"));
    assert_eq!(notifications[0].sender_id, None);
    assert!(notifications[1].is_read);
    assert_eq!(notifications[2].kind, NotificationType::Unknown);

    // Offset-less backend timestamps are UTC
    let created = notifications[0].created_at;
    assert_eq!(
        created.with_nanosecond(0).unwrap(),
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    );
    assert_eq!(created.nanosecond(), 123_456_000);
}

#[tokio::test]
async fn repository_trait_routes_to_client() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/notifications/unread-count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unread_count": 2 })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/notifications"))
        .and(query_param("limit", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let repo: &dyn NotificationRepository = &client_for(&server);
    assert_eq!(repo.unread_count().await.unwrap().unread_count, 2);
    assert!(repo.list(5).await.unwrap().is_empty());
}

// =============================================================================
// Writes
// =============================================================================

#[tokio::test]
async fn mark_read_patches_notification() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/v1/notifications/n42/read"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).send_mark_read("n42").await.unwrap();
}

#[tokio::test]
async fn mark_all_read_patches_collection() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/v1/notifications/mark-all-read"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).send_mark_all_read().await.unwrap();
}

// =============================================================================
// Errors
// =============================================================================

#[tokio::test]
async fn error_status_carries_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/notifications/unread-count"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Not authenticated"))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_unread_count().await.unwrap_err();

    assert!(err.is_unauthorized());
    match err {
        ApiError::Status { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "Not authenticated");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn error_status_without_body_reports_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/notifications"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_notifications(10).await.unwrap_err();

    assert_eq!(err.status(), Some(503));
    match err {
        ApiError::Status { body, .. } => assert_eq!(body, "HTTP 503"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/notifications/unread-count"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_unread_count().await.unwrap_err();
    assert!(matches!(err, ApiError::Http(_)));
}

#[tokio::test]
async fn repository_errors_surface_as_anyhow() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/v1/notifications/mark-all-read"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let repo: &dyn NotificationRepository = &client;
    let err = repo.mark_all_read().await.unwrap_err();

    let api_err = err.downcast_ref::<ApiError>().unwrap();
    assert_eq!(api_err.status(), Some(500));
}
