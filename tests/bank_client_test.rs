use bigdecimal::BigDecimal;
use bizbank_core::bank::{BankBackend, BankError, PartnerBankClient, RemoteTransferClient};
use bizbank_core::domain::{
    EndpointRef, EndpointType, ExecuteRequest, Party, PartyDetails, Rail, RoutingContext,
    TransferStatus,
};
use mockito::Matcher;
use serde_json::json;
use uuid::Uuid;

fn request(rail: Rail) -> ExecuteRequest {
    ExecuteRequest {
        transfer_id: Uuid::new_v4(),
        business_id: Uuid::new_v4(),
        rail,
        source: Party {
            endpoint: EndpointRef {
                id: Uuid::new_v4(),
                kind: EndpointType::Account,
            },
            details: PartyDetails::Account {
                bank_account_id: "acct_operating".to_string(),
                name: "Operating".to_string(),
            },
        },
        destination: Party {
            endpoint: EndpointRef {
                id: Uuid::new_v4(),
                kind: EndpointType::Account,
            },
            details: PartyDetails::Account {
                bank_account_id: "acct_payroll".to_string(),
                name: "Payroll".to_string(),
            },
        },
        amount: BigDecimal::from(250),
        currency: "USD".to_string(),
        notes: Some("March payroll".to_string()),
        context: RoutingContext::BusinessInternal,
        payment_request_id: None,
        interest_id: None,
        cvv: None,
    }
}

#[tokio::test]
async fn test_partner_execute_posts_to_rail_path() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v2/transfers/ach/push")
        .match_header("authorization", "Bearer test-key")
        .match_body(Matcher::PartialJson(json!({
            "amount": "250",
            "currency": "USD",
            "source": { "type": "ACCOUNT", "account_id": "acct_operating" }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "bt_9001",
                "reference_id": null,
                "status": "PROCESSING",
                "created_at": "2024-05-01T12:00:00Z"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = PartnerBankClient::new(server.url(), "test-key".to_string(), 200);
    let req = request(Rail::AchPush);
    let transfer = client.execute(&req).await.unwrap();

    mock.assert_async().await;
    assert_eq!(transfer.id, req.transfer_id);
    assert_eq!(transfer.bank_transfer_id, "bt_9001");
    assert_eq!(transfer.status, TransferStatus::InProcess);
    assert_eq!(transfer.rail, Rail::AchPush);
}

#[tokio::test]
async fn test_partner_auto_decline_surfaces_selected_reason() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v2/transfers/ach/pull")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "bt_9002",
                "reference_id": null,
                "status": "AUTO_DECLINED",
                "created_at": "2024-05-01T12:00:00Z",
                "failure_reasons": [
                    { "code": 310, "message": "velocity limit" },
                    { "code": 120, "message": "informational" },
                    { "code": 205, "message": "insufficient available balance" }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = PartnerBankClient::new(server.url(), "test-key".to_string(), 200);
    let err = client.execute(&request(Rail::AchPull)).await.unwrap_err();

    match err {
        BankError::Rejected { code, message } => {
            assert_eq!(code, Some(205));
            assert_eq!(message, "insufficient available balance");
        }
        other => panic!("expected a rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_partner_unknown_status_is_a_translation_gap() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v2/transfers/bt_1")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "bt_1",
                "reference_id": null,
                "status": "ON_HOLD_FOREVER",
                "created_at": "2024-05-01T12:00:00Z"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = PartnerBankClient::new(server.url(), "test-key".to_string(), 200);
    let err = client.get_transfer("bt_1").await.unwrap_err();
    assert!(matches!(err, BankError::Translation(_)));
}

#[tokio::test]
async fn test_partner_missing_transfer_is_not_found() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v2/transfers/bt_missing")
        .with_status(404)
        .create_async()
        .await;

    let client = PartnerBankClient::new(server.url(), "test-key".to_string(), 200);
    let err = client.get_transfer("bt_missing").await.unwrap_err();
    assert!(matches!(err, BankError::TransferNotFound(_)));
}

#[tokio::test]
async fn test_partner_circuit_opens_after_failures() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v2/transfers/bt_2")
        .with_status(500)
        .expect_at_least(2)
        .create_async()
        .await;

    let client = PartnerBankClient::with_circuit_breaker(server.url(), "test-key".to_string(), 200, 2, 60);
    for _ in 0..2 {
        let err = client.get_transfer("bt_2").await.unwrap_err();
        assert!(matches!(err, BankError::InvalidResponse(_)));
    }

    let err = client.get_transfer("bt_2").await.unwrap_err();
    assert!(matches!(err, BankError::CircuitBreakerOpen(_)));
    assert_eq!(client.circuit_state(), "open");
}

#[tokio::test]
async fn test_partner_status_update_sends_partner_code() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("PATCH", "/v2/transfers/bt_3")
        .match_body(Matcher::Json(json!({ "status": "CANCELED" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "bt_3",
                "reference_id": null,
                "status": "CANCELED",
                "created_at": "2024-05-01T12:00:00Z"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = PartnerBankClient::new(server.url(), "test-key".to_string(), 200);
    let snapshot = client
        .update_transfer_status("bt_3", TransferStatus::Canceled)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(snapshot.status, TransferStatus::Canceled);
}

#[tokio::test]
async fn test_remote_execute_reads_envelope() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/internal/v1/transfers")
        .match_body(Matcher::PartialJson(json!({ "rail": "debit_push", "amount": "250" })))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "transfer": {
                    "bankTransferId": "bt_7001",
                    "status": "REVIEW",
                    "createdAt": "2024-05-01T12:00:00Z"
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = RemoteTransferClient::new(server.url(), 200);
    let transfer = client.execute(&request(Rail::DebitPush)).await.unwrap();

    mock.assert_async().await;
    assert_eq!(transfer.bank_transfer_id, "bt_7001");
    assert_eq!(transfer.status, TransferStatus::AgentReview);
}

#[tokio::test]
async fn test_remote_decline_uses_same_selection() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/internal/v1/transfers")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "transfer": {
                    "bankTransferId": "bt_7002",
                    "status": "AUTO_DECLINED",
                    "createdAt": "2024-05-01T12:00:00Z"
                },
                "declineReasons": [
                    { "code": 150, "message": "informational" }
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = RemoteTransferClient::new(server.url(), 200);
    let err = client.execute(&request(Rail::AchPush)).await.unwrap_err();
    assert!(matches!(err, BankError::Rejected { code: None, .. }));
}

const CREATED_AT: &str = "2024-05-01T12:00:00Z";

async fn partner_answering(status: &str, reasons: serde_json::Value) -> mockito::ServerGuard {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/v2/transfers/ach/push")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "bt_partner",
                "reference_id": null,
                "status": status,
                "created_at": CREATED_AT,
                "failure_reasons": reasons
            })
            .to_string(),
        )
        .create_async()
        .await;
    server
}

async fn remote_answering(status: &str, reasons: serde_json::Value) -> mockito::ServerGuard {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/internal/v1/transfers")
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "transfer": {
                    "bankTransferId": "bt_remote",
                    "status": status,
                    "createdAt": CREATED_AT
                },
                "declineReasons": reasons
            })
            .to_string(),
        )
        .create_async()
        .await;
    server
}

#[tokio::test]
async fn test_backends_produce_identical_transfers() {
    for status in ["PROCESSING", "REVIEW", "COMPLETED"] {
        let partner_server = partner_answering(status, json!([])).await;
        let remote_server = remote_answering(status, json!([])).await;
        let partner = PartnerBankClient::new(partner_server.url(), "test-key".to_string(), 200);
        let remote = RemoteTransferClient::new(remote_server.url(), 200);

        let req = request(Rail::AchPush);
        let from_partner = partner.execute(&req).await.unwrap();
        let mut from_remote = remote.execute(&req).await.unwrap();

        assert_eq!(from_partner.bank_transfer_id, "bt_partner");
        assert_eq!(from_remote.bank_transfer_id, "bt_remote");
        from_remote.bank_transfer_id = from_partner.bank_transfer_id.clone();
        assert_eq!(from_partner, from_remote, "backends disagree on {}", status);
    }
}

#[tokio::test]
async fn test_backends_select_the_same_decline_reason() {
    let reasons = json!([
        { "code": 310, "message": "velocity limit" },
        { "code": 120, "message": "informational" },
        { "code": 205, "message": "insufficient available balance" }
    ]);
    let partner_server = partner_answering("AUTO_DECLINED", reasons.clone()).await;
    let remote_server = remote_answering("AUTO_DECLINED", reasons).await;
    let partner = PartnerBankClient::new(partner_server.url(), "test-key".to_string(), 200);
    let remote = RemoteTransferClient::new(remote_server.url(), 200);

    let req = request(Rail::AchPush);
    for err in [
        partner.execute(&req).await.unwrap_err(),
        remote.execute(&req).await.unwrap_err(),
    ] {
        match err {
            BankError::Rejected { code, message } => {
                assert_eq!(code, Some(205));
                assert_eq!(message, "insufficient available balance");
            }
            other => panic!("expected a rejection, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_remote_get_transfer_reads_status() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/internal/v1/transfers/bt_7003")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "transfer": {
                    "bankTransferId": "bt_7003",
                    "status": "COMPLETED",
                    "createdAt": CREATED_AT
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = RemoteTransferClient::new(server.url(), 200);
    let snapshot = client.get_transfer("bt_7003").await.unwrap();

    mock.assert_async().await;
    assert_eq!(snapshot.bank_transfer_id, "bt_7003");
    assert_eq!(snapshot.status, TransferStatus::Posted);
    assert!(snapshot.decline.is_none());
}

#[tokio::test]
async fn test_remote_get_transfer_settles_auto_decline_as_canceled() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/internal/v1/transfers/bt_7004")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "transfer": {
                    "bankTransferId": "bt_7004",
                    "status": "AUTO_DECLINED",
                    "createdAt": CREATED_AT
                },
                "declineReasons": [{ "code": 240, "message": "account frozen" }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = RemoteTransferClient::new(server.url(), 200);
    let snapshot = client.get_transfer("bt_7004").await.unwrap();

    assert_eq!(snapshot.status, TransferStatus::Canceled);
    let decline = snapshot.decline.unwrap();
    assert_eq!(decline.code, Some(240));
    assert_eq!(decline.message, "account frozen");
}

#[tokio::test]
async fn test_remote_missing_transfer_is_not_found() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/internal/v1/transfers/bt_missing")
        .with_status(404)
        .create_async()
        .await;

    let client = RemoteTransferClient::new(server.url(), 200);
    let err = client.get_transfer("bt_missing").await.unwrap_err();
    assert!(matches!(err, BankError::TransferNotFound(_)));
}

#[tokio::test]
async fn test_remote_status_update_sends_partner_code() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/internal/v1/transfers/bt_7005/status")
        .match_body(Matcher::Json(json!({ "status": "PROCESSING" })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "transfer": {
                    "bankTransferId": "bt_7005",
                    "status": "PROCESSING",
                    "createdAt": CREATED_AT
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = RemoteTransferClient::new(server.url(), 200);
    let snapshot = client
        .update_transfer_status("bt_7005", TransferStatus::InProcess)
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(snapshot.status, TransferStatus::InProcess);
}

#[tokio::test]
async fn test_partner_status_update_declined_by_bank() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("PATCH", "/v2/transfers/bt_4")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "id": "bt_4",
                "reference_id": null,
                "status": "AUTO_DECLINED",
                "created_at": CREATED_AT,
                "failure_reasons": [{ "code": 150, "message": "informational" }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let client = PartnerBankClient::new(server.url(), "test-key".to_string(), 200);
    let snapshot = client
        .update_transfer_status("bt_4", TransferStatus::InProcess)
        .await
        .unwrap();

    assert_eq!(snapshot.status, TransferStatus::Canceled);
    assert_eq!(snapshot.decline.map(|d| d.code), Some(None));
}
