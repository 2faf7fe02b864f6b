mod common;

use axum::body::{Body, HttpBody};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use bizbank_core::create_app;
use bizbank_core::domain::{AccountOrigin, AccountUsage};
use common::{Harness, WEBHOOK_SECRET};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use tower::ServiceExt;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

fn sign(body: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(WEBHOOK_SECRET.as_bytes()).unwrap();
    mac.update(body.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

async fn body_json(response: Response) -> Value {
    let mut body = response.into_body();
    let mut bytes = Vec::new();
    while let Some(chunk) = body.data().await {
        bytes.extend_from_slice(&chunk.unwrap());
    }
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, business_id: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(business_id) = business_id {
        builder = builder.header("X-Business-Id", business_id);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn webhook_request(body: &str, signature: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/webhooks/bank")
        .header("content-type", "application/json");
    if let Some(signature) = signature {
        builder = builder.header("X-Bank-Signature", signature);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_health_reports_database_down() {
    let h = Harness::new();
    let app = create_app(h.state.clone());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["db"], "disconnected");
    assert_eq!(body["bank_backend"], "scripted");
}

#[tokio::test]
async fn test_submit_transfer_requires_business_header() {
    let h = Harness::new();
    let app = create_app(h.state.clone());
    let payload = json!({
        "source_id": Uuid::new_v4(),
        "source_type": "account",
        "destination_id": Uuid::new_v4(),
        "destination_type": "account",
        "amount": "10.00"
    });

    let response = app
        .clone()
        .oneshot(json_request("POST", "/transfers", None, &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .oneshot(json_request("POST", "/transfers", Some("not-a-uuid"), &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_submit_and_fetch_transfer() {
    let h = Harness::new();
    let source = h.operating_account("1000").await;
    let destination = h
        .account("Payroll", AccountUsage::Clearing, AccountOrigin::Bank, Some("0"))
        .await;
    let app = create_app(h.state.clone());
    let business = h.business_id.to_string();

    let payload = json!({
        "source_id": source.id,
        "source_type": "account",
        "destination_id": destination.id,
        "destination_type": "account",
        "amount": "120.00",
        "notes": "March payroll"
    });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/transfers", Some(&business), &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["status"], "in_process");
    assert_eq!(created["rail"], "ach_push");

    let uri = format!("/transfers/{}", created["id"].as_str().unwrap());
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(&uri)
                .header("X-Business-Id", &business)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri(&uri)
                .header("X-Business-Id", Uuid::new_v4().to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_limit_breach_is_unprocessable() {
    let h = Harness::new();
    let source = h.operating_account("5000").await;
    let linked = h
        .account("Linked Savings", AccountUsage::External, AccountOrigin::Aggregator, None)
        .await;
    let app = create_app(h.state.clone());

    let payload = json!({
        "source_id": source.id,
        "source_type": "account",
        "destination_id": linked.id,
        "destination_type": "account",
        "amount": "1500"
    });
    let response = app
        .oneshot(json_request("POST", "/transfers", Some(&h.business_id.to_string()), &payload))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(h.bank.executed().await.is_empty());
}

#[tokio::test]
async fn test_webhook_rejects_missing_and_bad_signatures() {
    let h = Harness::new();
    let app = create_app(h.state.clone());
    let body = r#"{"event_type":"transfer.status","transfer_id":"bt_1","status":"COMPLETED"}"#;

    let response = app.clone().oneshot(webhook_request(body, None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(webhook_request(body, Some("deadbeef")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .oneshot(webhook_request(body, Some("zz-not-hex")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_webhook_for_unknown_transfer_is_not_found() {
    let h = Harness::new();
    let app = create_app(h.state.clone());
    let body = r#"{"event_type":"transfer.status","transfer_id":"bt_404","status":"COMPLETED"}"#;

    let response = app
        .oneshot(webhook_request(body, Some(&sign(body))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_webhook_records_transaction_event() {
    let h = Harness::new();
    let account = h.operating_account("0").await;
    let app = create_app(h.state.clone());

    let body = json!({
        "event_type": "transaction.status",
        "transaction_id": "btx-500",
        "transfer_id": null,
        "business_id": h.business_id,
        "account_id": account.id,
        "status": "IN_PROCESS",
        "category": "ACH",
        "type": "ACH_CREDIT",
        "amount": "18.25",
        "currency": "USD",
        "direction": "CREDIT",
        "description": "ACH CREDIT FROM GLOBEX",
        "occurred_at": "2024-05-01T12:00:00Z",
        "contact_id": null,
        "card": null,
        "hold": null
    })
    .to_string();

    let response = app
        .clone()
        .oneshot(webhook_request(&body, Some(&sign(&body))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["partition"], "pending");
    assert_eq!(h.publisher.events().await.len(), 1);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/transactions?partition=pending&limit=10")
                .header("X-Business-Id", h.business_id.to_string())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = body_json(response).await;
    assert_eq!(listed["limit"], 10);
    assert_eq!(listed["transactions"].as_array().unwrap().len(), 1);
    assert_eq!(listed["transactions"][0]["display"]["source_display"], "GLOBEX");
}

#[tokio::test]
async fn test_webhook_with_malformed_payload_is_bad_request() {
    let h = Harness::new();
    let app = create_app(h.state.clone());
    let body = r#"{"event_type":"account.closed"}"#;

    let response = app
        .oneshot(webhook_request(body, Some(&sign(body))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_webhook_auto_decline_cancels_transfer() {
    let h = Harness::new();
    let source = h.operating_account("1000").await;
    let destination = h
        .account("Payroll", AccountUsage::Clearing, AccountOrigin::Bank, Some("0"))
        .await;
    let app = create_app(h.state.clone());

    let payload = json!({
        "source_id": source.id,
        "source_type": "account",
        "destination_id": destination.id,
        "destination_type": "account",
        "amount": "40.00"
    });
    let response = app
        .clone()
        .oneshot(json_request("POST", "/transfers", Some(&h.business_id.to_string()), &payload))
        .await
        .unwrap();
    let created = body_json(response).await;

    let body = json!({
        "event_type": "transfer.status",
        "transfer_id": created["bank_transfer_id"],
        "status": "AUTO_DECLINED",
        "failure_reasons": [{ "code": 220, "message": "account restricted" }]
    })
    .to_string();
    let response = app
        .oneshot(webhook_request(&body, Some(&sign(&body))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["transfer_status"], "canceled");
}
