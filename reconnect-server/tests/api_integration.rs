//! API integration tests for reconnect-server.
//!
//! Drives the full REST surface against the in-memory store: agreement
//! creation, signing to completion, status transitions, and the four-way
//! verification distinction (valid / NOT_FOUND / INCOMPLETE /
//! HASH_MISMATCH).

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use reconnect_server::store::{AgreementStore, MemoryAgreementStore};
use reconnect_server::{create_router, AppState, Config};

/// A test couple with the identity headers both sides send.
struct Couple {
    author_id: Uuid,
    partner_id: Uuid,
    couple_id: Uuid,
}

impl Couple {
    fn new() -> Self {
        Self {
            author_id: Uuid::new_v4(),
            partner_id: Uuid::new_v4(),
            couple_id: Uuid::new_v4(),
        }
    }

    fn author_headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("x-user-id", self.author_id.to_string()),
            ("x-user-name", "Jiwoo".to_string()),
            ("x-partner-id", self.partner_id.to_string()),
            ("x-partner-name", "Minjun".to_string()),
            ("x-couple-id", self.couple_id.to_string()),
        ]
    }

    fn partner_headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("x-user-id", self.partner_id.to_string()),
            ("x-user-name", "Minjun".to_string()),
            ("x-partner-id", self.author_id.to_string()),
            ("x-partner-name", "Jiwoo".to_string()),
            ("x-couple-id", self.couple_id.to_string()),
        ]
    }
}

fn create_test_app() -> (Router, Arc<MemoryAgreementStore>) {
    let store = Arc::new(MemoryAgreementStore::new());
    let state = AppState::new(store.clone(), None, Config::default());
    (create_router(state), store)
}

fn request(
    method: Method,
    uri: &str,
    headers: &[(&'static str, String)],
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, value);
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn create_body() -> Value {
    json!({
        "title": "Weekly check-in",
        "content": "Share feelings every Sunday",
        "condition": "Write an apology note",
        "partnerId": "",
        "authorSignature": { "image": "aW5rLWF1dGhvcg==", "hash": "a1f3" }
    })
}

async fn create_agreement(app: &Router, couple: &Couple) -> Value {
    let mut body = create_body();
    body["partnerId"] = json!(couple.partner_id.to_string());
    let response = app
        .clone()
        .oneshot(request(
            Method::POST,
            "/agreements",
            &couple.author_headers(),
            Some(body),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await
}

async fn sign_as_partner(app: &Router, couple: &Couple, id: &str) -> axum::response::Response {
    app.clone()
        .oneshot(request(
            Method::PUT,
            &format!("/agreements/{id}/sign"),
            &couple.partner_headers(),
            Some(json!({ "signature": { "image": "aW5rLXBhcnRuZXI=", "hash": "b2e4" } })),
        ))
        .await
        .unwrap()
}

// ============================================================================
// Health & Readiness
// ============================================================================

#[tokio::test]
async fn test_health_endpoint_returns_ok() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(request(Method::GET, "/health", &[], None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["storage"], "memory");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_ready_endpoint_returns_ok() {
    let (app, _) = create_test_app();

    let response = app
        .oneshot(request(Method::GET, "/ready", &[], None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["ready"], true);
}

// ============================================================================
// Creation
// ============================================================================

#[tokio::test]
async fn test_create_agreement_starts_pending() {
    let (app, _) = create_test_app();
    let couple = Couple::new();

    let created = create_agreement(&app, &couple).await;
    assert_eq!(created["status"], "pending");
    assert_eq!(created["title"], "Weekly check-in");
    assert_eq!(created["authorName"], "Jiwoo");
    assert_eq!(created["partnerName"], "Minjun");
    assert_eq!(created["awaiting"], "partner");
    assert!(created["authorSignature"]["hash"].is_string());
    assert!(created.get("agreementHash").is_none() || created["agreementHash"].is_null());
}

#[tokio::test]
async fn test_create_without_identity_is_unauthorized() {
    let (app, _) = create_test_app();
    let response = app
        .oneshot(request(
            Method::POST,
            "/agreements",
            &[],
            Some(create_body()),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_create_with_missing_signature_is_rejected() {
    let (app, _) = create_test_app();
    let couple = Couple::new();

    let mut body = create_body();
    body["partnerId"] = json!(couple.partner_id.to_string());
    body["authorSignature"] = json!({ "image": "", "hash": "" });

    let response = app
        .oneshot(request(
            Method::POST,
            "/agreements",
            &couple.author_headers(),
            Some(body),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_FAILED");
}

#[tokio::test]
async fn test_create_with_blank_title_is_rejected() {
    let (app, _) = create_test_app();
    let couple = Couple::new();

    let mut body = create_body();
    body["partnerId"] = json!(couple.partner_id.to_string());
    body["title"] = json!("   ");

    let response = app
        .oneshot(request(
            Method::POST,
            "/agreements",
            &couple.author_headers(),
            Some(body),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_with_foreign_partner_is_rejected() {
    let (app, _) = create_test_app();
    let couple = Couple::new();

    let mut body = create_body();
    body["partnerId"] = json!(Uuid::new_v4().to_string());

    let response = app
        .oneshot(request(
            Method::POST,
            "/agreements",
            &couple.author_headers(),
            Some(body),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Reading
// ============================================================================

#[tokio::test]
async fn test_both_parties_see_the_agreement() {
    let (app, _) = create_test_app();
    let couple = Couple::new();
    let created = create_agreement(&app, &couple).await;
    let id = created["id"].as_str().unwrap();

    for headers in [couple.author_headers(), couple.partner_headers()] {
        let response = app
            .clone()
            .oneshot(request(
                Method::GET,
                &format!("/agreements/{id}"),
                &headers,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let listed = app
        .clone()
        .oneshot(request(
            Method::GET,
            "/agreements/my",
            &couple.partner_headers(),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(listed.status(), StatusCode::OK);
    assert_eq!(body_json(listed).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_outsider_cannot_read() {
    let (app, _) = create_test_app();
    let couple = Couple::new();
    let created = create_agreement(&app, &couple).await;
    let id = created["id"].as_str().unwrap();

    let outsider = Couple::new();
    let response = app
        .oneshot(request(
            Method::GET,
            &format!("/agreements/{id}"),
            &outsider.author_headers(),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// ============================================================================
// Signing & lifecycle
// ============================================================================

#[tokio::test]
async fn test_partner_sign_completes_and_seals() {
    let (app, _) = create_test_app();
    let couple = Couple::new();
    let created = create_agreement(&app, &couple).await;
    let id = created["id"].as_str().unwrap();

    let response = sign_as_partner(&app, &couple, id).await;
    assert_eq!(response.status(), StatusCode::OK);

    let signed = body_json(response).await;
    assert_eq!(signed["status"], "completed");
    assert!(signed["agreementHash"].is_string());
    assert!(signed["sealedAt"].is_string());
    assert!(signed.get("awaiting").is_none() || signed["awaiting"].is_null());
}

#[tokio::test]
async fn test_second_sign_is_a_conflict_not_a_no_op() {
    let (app, _) = create_test_app();
    let couple = Couple::new();
    let created = create_agreement(&app, &couple).await;
    let id = created["id"].as_str().unwrap();

    assert_eq!(
        sign_as_partner(&app, &couple, id).await.status(),
        StatusCode::OK
    );

    let retry = sign_as_partner(&app, &couple, id).await;
    assert_eq!(retry.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(retry).await["code"], "CONCURRENT_UPDATE");
}

#[tokio::test]
async fn test_author_cancels_via_status_endpoint() {
    let (app, _) = create_test_app();
    let couple = Couple::new();
    let created = create_agreement(&app, &couple).await;
    let id = created["id"].as_str().unwrap();

    // The partner is not the author and may not cancel.
    let forbidden = app
        .clone()
        .oneshot(request(
            Method::PUT,
            &format!("/agreements/{id}/status"),
            &couple.partner_headers(),
            Some(json!({ "status": "cancelled" })),
        ))
        .await
        .unwrap();
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(request(
            Method::PUT,
            &format!("/agreements/{id}/status"),
            &couple.author_headers(),
            Some(json!({ "status": "cancelled" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "cancelled");

    // Signing a cancelled agreement is rejected.
    let late_sign = sign_as_partner(&app, &couple, id).await;
    assert_eq!(late_sign.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_unknown_status_value_is_rejected() {
    let (app, _) = create_test_app();
    let couple = Couple::new();
    let created = create_agreement(&app, &couple).await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .oneshot(request(
            Method::PUT,
            &format!("/agreements/{id}/status"),
            &couple.author_headers(),
            Some(json!({ "status": "archived" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// Verification
// ============================================================================

#[tokio::test]
async fn test_verification_distinguishes_all_failure_kinds() {
    let (app, store) = create_test_app();
    let couple = Couple::new();

    // (a) Random nonexistent ID.
    let response = app
        .clone()
        .oneshot(request(
            Method::GET,
            &format!("/agreements/{}/verify", Uuid::new_v4()),
            &[],
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["valid"], false);
    assert_eq!(json["reason"], "NOT_FOUND");

    // (b) A real pending agreement.
    let pending = create_agreement(&app, &couple).await;
    let pending_id = pending["id"].as_str().unwrap();
    let response = app
        .clone()
        .oneshot(request(
            Method::GET,
            &format!("/agreements/{pending_id}/verify"),
            &[],
            None,
        ))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["valid"], false);
    assert_eq!(json["reason"], "INCOMPLETE");

    // (d) An untouched completed agreement.
    let second_couple = Couple::new();
    let created = create_agreement(&app, &second_couple).await;
    let id = created["id"].as_str().unwrap();
    sign_as_partner(&app, &second_couple, id).await;

    let response = app
        .clone()
        .oneshot(request(
            Method::GET,
            &format!("/agreements/{id}/verify"),
            &[],
            None,
        ))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["valid"], true);
    assert_eq!(json["agreement"]["id"], id);

    // (c) The same agreement with a stored field altered after sealing.
    let uuid: Uuid = id.parse().unwrap();
    let mut tampered = store.find_by_id(uuid).await.unwrap().unwrap();
    tampered.content = "Share feelings every other Sunday".into();
    store.overwrite_unchecked(tampered);

    let response = app
        .clone()
        .oneshot(request(
            Method::GET,
            &format!("/agreements/{id}/verify"),
            &[],
            None,
        ))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["valid"], false);
    assert_eq!(json["reason"], "HASH_MISMATCH");
}

#[tokio::test]
async fn test_verify_decoded_payload() {
    let (app, _) = create_test_app();
    let couple = Couple::new();
    let created = create_agreement(&app, &couple).await;
    let id = created["id"].as_str().unwrap().to_string();
    let signed = body_json(sign_as_partner(&app, &couple, &id).await).await;

    let sealed_at: chrono::DateTime<chrono::Utc> =
        signed["sealedAt"].as_str().unwrap().parse().unwrap();
    let mut payload = json!({
        "agreementId": id,
        "title": signed["title"],
        "date": reconnect_core::hash::format_kst_date(sealed_at),
        "authorName": signed["authorName"],
        "partnerName": signed["partnerName"],
        "agreementHash": signed["agreementHash"],
        "verificationUrl": format!("http://localhost:3000/verify/{id}"),
        "timestamp": "2026-03-01T12:00:00+00:00",
        "platform": "reconnect",
    });

    let response = app
        .clone()
        .oneshot(request(Method::POST, "/verify", &[], Some(payload.clone())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["valid"], true);

    // A hand-edited payload hash is caught even though the record is intact.
    payload["agreementHash"] = json!("deadbeef");
    let response = app
        .clone()
        .oneshot(request(Method::POST, "/verify", &[], Some(payload)))
        .await
        .unwrap();
    let json = body_json(response).await;
    assert_eq!(json["valid"], false);
    assert_eq!(json["reason"], "HASH_MISMATCH");
}

#[tokio::test]
async fn test_verify_malformed_payload_is_rejected() {
    let (app, _) = create_test_app();
    let response = app
        .oneshot(request(
            Method::POST,
            "/verify",
            &[],
            Some(json!({ "agreementId": "123" })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_FAILED");
}

// ============================================================================
// Document issuance
// ============================================================================

#[tokio::test]
async fn test_document_without_font_is_a_render_failure() {
    // The test app is built without fonts, so issuance must fail cleanly
    // with the render category and no partial file.
    let (app, _) = create_test_app();
    let couple = Couple::new();
    let created = create_agreement(&app, &couple).await;
    let id = created["id"].as_str().unwrap();

    let response = app
        .oneshot(request(
            Method::GET,
            &format!("/agreements/{id}/document"),
            &couple.author_headers(),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["code"], "RENDER_FAILED");
}

#[tokio::test]
async fn test_document_for_outsider_is_forbidden() {
    let (app, _) = create_test_app();
    let couple = Couple::new();
    let created = create_agreement(&app, &couple).await;
    let id = created["id"].as_str().unwrap();

    let outsider = Couple::new();
    let response = app
        .oneshot(request(
            Method::GET,
            &format!("/agreements/{id}/document"),
            &outsider.author_headers(),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
