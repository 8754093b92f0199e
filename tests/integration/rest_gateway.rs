//! Integration test: REST gateway against a mocked fullnode.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use authkey_rotate::gateway::rest::BCS_SIGNED_TRANSACTION;
use authkey_rotate::gateway::{ChainGateway, ChainStatus, RestGateway};
use authkey_rotate::{
    AccountAddress, FinalityPolicy, Identity, RotationError, RotationProofBuilder,
    RotationWorkflow, TxnHandle,
};

const ORIGINATING_RESOURCE_PATH: &str =
    "/v1/accounts/0x0000000000000000000000000000000000000000000000000000000000000001/resource/0x1::account::OriginatingAddress";

async fn node() -> (MockServer, RestGateway) {
    let server = MockServer::start().await;
    let gateway = RestGateway::new(&format!("{}/v1", server.uri())).expect("valid endpoint");
    (server, gateway)
}

async fn mount_originating_table(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(ORIGINATING_RESOURCE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "0x1::account::OriginatingAddress",
            "data": { "address_map": { "handle": "0xdead" } }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn sequence_number_is_parsed_from_account() {
    let (server, gateway) = node().await;
    let alice = Identity::generate();

    Mock::given(method("GET"))
        .and(path(format!("/v1/accounts/{}", alice.address())))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sequence_number": "7",
            "authentication_key": alice.authentication_key().to_hex(),
        })))
        .mount(&server)
        .await;

    assert_eq!(gateway.sequence_number(&alice.address()).await.unwrap(), 7);
}

#[tokio::test]
async fn missing_account_is_not_found() {
    let (server, gateway) = node().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "Account not found",
            "error_code": "account_not_found"
        })))
        .mount(&server)
        .await;

    let err = gateway
        .sequence_number(&AccountAddress::from_hex("0xa11ce").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, RotationError::NotFound(_)));
}

#[tokio::test]
async fn poll_status_maps_node_responses() {
    let (server, gateway) = node().await;

    Mock::given(method("GET"))
        .and(path("/v1/transactions/by_hash/0x01"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/transactions/by_hash/0x02"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "type": "pending_transaction", "hash": "0x02" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/transactions/by_hash/0x03"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "user_transaction",
            "version": "123",
            "success": true,
            "vm_status": "Executed successfully"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/transactions/by_hash/0x04"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "user_transaction",
            "version": "124",
            "success": false,
            "vm_status": "Move abort in 0x1::account: EINVALID_PROOF_OF_KNOWLEDGE(0x8)"
        })))
        .mount(&server)
        .await;

    let poll = |h: &str| {
        let handle = TxnHandle::new(h);
        let gateway = &gateway;
        async move { gateway.poll_status(&handle).await.unwrap() }
    };
    assert_eq!(poll("0x01").await, ChainStatus::Pending);
    assert_eq!(poll("0x02").await, ChainStatus::Pending);
    assert_eq!(
        poll("0x03").await,
        ChainStatus::Committed { version: Some(123) }
    );
    match poll("0x04").await {
        ChainStatus::Failed { reason } => assert!(reason.contains("EINVALID_PROOF_OF_KNOWLEDGE")),
        other => panic!("expected Failed, got {other:?}"),
    }
}

#[tokio::test]
async fn server_errors_during_poll_are_retryable_api_errors() {
    let (server, gateway) = node().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({ "message": "overloaded" })))
        .mount(&server)
        .await;

    let err = gateway
        .poll_status(&TxnHandle::new("0x05"))
        .await
        .unwrap_err();
    assert!(matches!(err, RotationError::Api { status: 503, ref message } if message == "overloaded"));
    assert!(err.is_transient());
}

#[tokio::test]
async fn submit_posts_bcs_and_returns_hash() {
    let (server, gateway) = node().await;
    let alice = Identity::generate();
    let bob = Identity::generate();

    Mock::given(method("GET"))
        .and(path("/v1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "chain_id": 4 })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/transactions"))
        .and(header("content-type", BCS_SIGNED_TRANSACTION))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "hash": "0xfeed" })))
        .expect(1)
        .mount(&server)
        .await;

    let authorization = RotationProofBuilder::new(&alice)
        .sequence_number(0)
        .build(bob.derive_public_key())
        .unwrap()
        .countersign(&bob)
        .unwrap();
    let op = gateway.submit_rotation(&alice, &authorization).await.unwrap();
    assert_eq!(op.handle, TxnHandle::new("0xfeed"));

    let requests = server.received_requests().await.unwrap();
    let submitted = requests
        .iter()
        .find(|r| r.url.path() == "/v1/transactions")
        .expect("submission request");
    // Raw transaction starts with the sender, then its sequence number.
    assert_eq!(&submitted.body[..32], alice.address().as_bytes());
    assert_eq!(&submitted.body[32..40], &0u64.to_le_bytes());
}

#[tokio::test]
async fn rejected_submission_surfaces_node_message() {
    let (server, gateway) = node().await;
    let gateway = gateway.with_chain_id(4);
    let alice = Identity::generate();
    let bob = Identity::generate();

    Mock::given(method("POST"))
        .and(path("/v1/transactions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "message": "Invalid transaction: Type: Validation Code: SEQUENCE_NUMBER_TOO_OLD",
            "error_code": "vm_error"
        })))
        .mount(&server)
        .await;

    let authorization = RotationProofBuilder::new(&alice)
        .build(bob.derive_public_key())
        .unwrap()
        .countersign(&bob)
        .unwrap();
    let err = gateway
        .submit_rotation(&alice, &authorization)
        .await
        .unwrap_err();
    assert!(matches!(err, RotationError::Submission(ref m) if m.contains("SEQUENCE_NUMBER_TOO_OLD")));
}

#[tokio::test]
async fn resolve_reads_originating_address_table() {
    let (server, gateway) = node().await;
    let bob = Identity::generate();
    mount_originating_table(&server).await;

    Mock::given(method("POST"))
        .and(path("/v1/tables/0xdead/item"))
        .and(body_json(json!({
            "key_type": "address",
            "value_type": "address",
            "key": bob.natural_address().to_hex(),
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!("0xa11ce")))
        .mount(&server)
        .await;

    let original = gateway
        .resolve_original_address(&bob.natural_address())
        .await
        .unwrap();
    assert_eq!(original, AccountAddress::from_hex("0xa11ce").unwrap());
}

#[tokio::test]
async fn resolve_without_record_is_not_found() {
    let (server, gateway) = node().await;
    mount_originating_table(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/tables/0xdead/item"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "Table Item not found by Table handle(0xdead)",
            "error_code": "table_item_not_found"
        })))
        .mount(&server)
        .await;

    let err = gateway
        .resolve_original_address(&Identity::generate().natural_address())
        .await
        .unwrap_err();
    assert!(matches!(err, RotationError::NotFound(ref m) if m.contains("no originating address")));
}

#[tokio::test]
async fn workflow_runs_end_to_end_over_rest() {
    let (server, gateway) = node().await;
    let alice = Identity::generate();
    let bob = Identity::generate();

    Mock::given(method("GET"))
        .and(path(format!("/v1/accounts/{}", alice.address())))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sequence_number": "3",
            "authentication_key": alice.authentication_key().to_hex(),
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "chain_id": 2 })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/transactions"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({ "hash": "0xbeef" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/transactions/by_hash/0xbeef"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "type": "user_transaction",
            "version": "99",
            "success": true,
            "vm_status": "Executed successfully"
        })))
        .mount(&server)
        .await;
    mount_originating_table(&server).await;
    Mock::given(method("POST"))
        .and(path("/v1/tables/0xdead/item"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(alice.address().to_hex())))
        .mount(&server)
        .await;

    let policy = FinalityPolicy {
        timeout: Duration::from_secs(5),
        poll_interval: Duration::from_millis(50),
    };
    let mut workflow =
        RotationWorkflow::new(Arc::new(gateway), alice.clone(), bob.clone(), policy).unwrap();
    let rotated = workflow.run().await.expect("rotation over REST should succeed");

    assert_eq!(rotated.address(), alice.address());
    assert!(rotated.same_keypair(&bob));
}
