//! Tests for transaction initiation.
//!
//! Initiation validates the amount locally, stores the pending transaction,
//! creates the gateway transaction and redirects with `token_ws` attached.

use serde_json::json;

#[path = "../common/mod.rs"]
mod common;
use common::{
    CREATE, CheckoutErrorCode, CheckoutOptions, MockBackend, NavEvent, PaymentRequest, Reply,
    SessionStore, TransactionType, harness, harness_with, keys, store_is_empty, test_property,
    unreachable_base_url,
};

fn request(amount: i64, subject: &str) -> PaymentRequest {
    PaymentRequest {
        amount,
        subject_reference: subject.to_string(),
        transaction_type: TransactionType::VisitReservation,
        description: Some("Reserva de visita".to_string()),
        property_context: None,
    }
}

#[tokio::test]
async fn test_initiate_builds_gateway_redirect() {
    let backend = MockBackend::new();
    backend.on_create(Reply::ok(json!({ "token": "T1", "url": "https://gw/pay" })));
    let h = harness(backend).await;

    let target = h
        .checkout
        .initiator()
        .initiate(request(15000, "prop-1"))
        .await
        .unwrap();

    assert_eq!(target.token, "T1");
    assert_eq!(target.url, "https://gw/pay?token_ws=T1");

    let creates = h.backend.requests_to(CREATE);
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].body, json!({ "amount": 15000, "url": "prop-1" }));

    assert_eq!(
        h.navigator.events(),
        vec![NavEvent::Redirect("https://gw/pay?token_ws=T1".to_string())]
    );

    // The pending transaction outlives the redirect
    let pending = h.checkout.session().load().unwrap();
    assert_eq!(pending.amount, 15000);
    assert_eq!(pending.subject_reference, "prop-1");
    assert_eq!(pending.transaction_type, TransactionType::VisitReservation);
}

#[tokio::test]
async fn test_amount_below_minimum_never_reaches_network() {
    let backend = MockBackend::new();
    backend.on_create(Reply::ok(json!({ "token": "T1", "url": "https://gw/pay" })));
    let h = harness(backend).await;

    for amount in [-100, 0, 1, 5_000, 9_999] {
        let err = h
            .checkout
            .initiator()
            .initiate(request(amount, "prop-1"))
            .await
            .unwrap_err();
        assert_eq!(
            err.code,
            CheckoutErrorCode::ValidationError,
            "amount {} should be rejected locally",
            amount
        );
    }

    assert!(h.backend.requests().is_empty(), "no request should be sent");
    assert!(store_is_empty(&h.store), "nothing should be stored");
    assert!(h.navigator.events().is_empty());
}

#[tokio::test]
async fn test_minimum_amount_is_accepted() {
    let backend = MockBackend::new();
    backend.on_create(Reply::ok(json!({ "token": "T1", "url": "https://gw/pay" })));
    let h = harness(backend).await;

    h.checkout
        .initiator()
        .initiate(request(10_000, "prop-1"))
        .await
        .unwrap();

    assert_eq!(h.backend.requests_to(CREATE).len(), 1);
}

#[tokio::test]
async fn test_token_already_in_gateway_url_is_not_duplicated() {
    let backend = MockBackend::new();
    backend.on_create(Reply::ok(json!({
        "token": "T1",
        "url": "https://gw/pay?token_ws=T1"
    })));
    let h = harness(backend).await;

    let target = h
        .checkout
        .initiator()
        .initiate(request(15000, "prop-1"))
        .await
        .unwrap();

    assert_eq!(target.url, "https://gw/pay?token_ws=T1");
    assert_eq!(target.url.matches("token_ws=").count(), 1);
}

#[tokio::test]
async fn test_malformed_create_response_clears_context() {
    let backend = MockBackend::new();
    backend.on_create(Reply::ok(json!({ "token": "T1" })));
    let h = harness(backend).await;

    let err = h
        .checkout
        .initiator()
        .initiate(request(15000, "prop-1"))
        .await
        .unwrap_err();

    assert_eq!(err.code, CheckoutErrorCode::ProtocolError);
    assert!(store_is_empty(&h.store));
    assert!(h.navigator.events().is_empty(), "must not navigate on failure");
}

#[tokio::test]
async fn test_empty_token_is_a_protocol_error() {
    let backend = MockBackend::new();
    backend.on_create(Reply::ok(json!({ "token": "", "url": "https://gw/pay" })));
    let h = harness(backend).await;

    let err = h
        .checkout
        .initiator()
        .initiate(request(15000, "prop-1"))
        .await
        .unwrap_err();

    assert_eq!(err.code, CheckoutErrorCode::ProtocolError);
    assert!(store_is_empty(&h.store));
}

#[tokio::test]
async fn test_backend_error_message_is_surfaced() {
    let backend = MockBackend::new();
    backend.on_create(Reply::status(
        500,
        json!({ "error": "Transbank no disponible" }),
    ));
    let h = harness(backend).await;

    let err = h
        .checkout
        .initiator()
        .initiate(request(15000, "prop-1"))
        .await
        .unwrap_err();

    assert_eq!(err.code, CheckoutErrorCode::GatewayRejection);
    assert_eq!(err.message, "Transbank no disponible");
    assert_eq!(err.status_code, Some(500));
    assert!(store_is_empty(&h.store));
}

#[tokio::test]
async fn test_unauthorized_without_body_message() {
    let backend = MockBackend::new();
    backend.on_create(Reply::status(401, json!({})));
    let h = harness(backend).await;

    let err = h
        .checkout
        .initiator()
        .initiate(request(15000, "prop-1"))
        .await
        .unwrap_err();

    assert_eq!(err.status_code, Some(401));
    assert!(err.message.contains("sign in"));
}

#[tokio::test]
async fn test_network_error_clears_context() {
    let store = std::sync::Arc::new(common::MemoryStorage::new());
    let checkout = common::Checkout::new(CheckoutOptions {
        base_url: Some(unreachable_base_url().await),
        storage: Some(store.clone()),
        ..Default::default()
    })
    .unwrap();

    let err = checkout
        .initiator()
        .initiate(request(15000, "prop-1"))
        .await
        .unwrap_err();

    assert_eq!(err.code, CheckoutErrorCode::NetworkError);
    assert!(!err.reached_backend());
    assert!(store_is_empty(&store));
}

#[tokio::test]
async fn test_bearer_token_is_attached() {
    let backend = MockBackend::new();
    backend.on_create(Reply::ok(json!({ "token": "T1", "url": "https://gw/pay" })));
    let h = harness_with(
        backend,
        CheckoutOptions {
            access_token: Some("access-123".to_string()),
            ..Default::default()
        },
    )
    .await;

    h.checkout
        .initiator()
        .initiate(request(15000, "prop-1"))
        .await
        .unwrap();

    let creates = h.backend.requests_to(CREATE);
    assert_eq!(creates[0].authorization.as_deref(), Some("Bearer access-123"));
}

#[tokio::test]
async fn test_wallet_deposit_uses_synthetic_reference() {
    let backend = MockBackend::new();
    backend.on_create(Reply::ok(json!({ "token": "W1", "url": "https://gw/pay" })));
    let h = harness(backend).await;

    h.checkout.initiator().deposit(25_000, None).await.unwrap();

    let pending = h.checkout.session().load().unwrap();
    assert_eq!(pending.transaction_type, TransactionType::WalletDeposit);
    assert_eq!(pending.description, "Carga de saldo a wallet");
    assert!(pending.subject_reference.starts_with("wallet://deposit/"));
    assert_eq!(pending.property_context, None);

    let creates = h.backend.requests_to(CREATE);
    assert_eq!(creates[0].body["amount"], json!(25_000));
    assert_eq!(
        creates[0].body["url"],
        json!(pending.subject_reference),
        "the stored reference is the one sent to the backend"
    );
}

#[tokio::test]
async fn test_reserve_visit_charges_ten_percent() {
    let backend = MockBackend::new();
    backend.on_create(Reply::ok(json!({ "token": "R1", "url": "https://gw/pay" })));
    let h = harness(backend).await;

    let property = test_property();
    h.checkout
        .initiator()
        .reserve_visit(property.clone())
        .await
        .unwrap();

    let creates = h.backend.requests_to(CREATE);
    assert_eq!(
        creates[0].body,
        json!({ "amount": 45_000, "url": "https://portal.example.com/propiedad/101" })
    );

    let pending = h.checkout.session().load().unwrap();
    assert_eq!(pending.description, "Reserva visita - Depto 2D1B Providencia");
    assert_eq!(pending.property_context, Some(property));
    assert_eq!(h.store.get(keys::PRICE).as_deref(), Some("450000"));
}

#[tokio::test]
async fn test_reserve_visit_below_minimum_is_rejected_locally() {
    let backend = MockBackend::new();
    let h = harness(backend).await;

    let mut property = test_property();
    property.price = Some(80_000);

    let err = h
        .checkout
        .initiator()
        .reserve_visit(property)
        .await
        .unwrap_err();

    assert_eq!(err.code, CheckoutErrorCode::ValidationError);
    assert!(err.message.contains("$8.000"));
    assert!(h.backend.requests().is_empty());
    assert!(store_is_empty(&h.store));
}

#[tokio::test]
async fn test_last_initiator_wins() {
    let backend = MockBackend::new();
    backend.on_create(Reply::ok(json!({ "token": "T1", "url": "https://gw/pay" })));
    let h = harness(backend).await;

    h.checkout
        .initiator()
        .reserve_visit(test_property())
        .await
        .unwrap();
    h.checkout.initiator().deposit(12_000, Some("Arriendo")).await.unwrap();

    let pending = h.checkout.session().load().unwrap();
    assert_eq!(pending.transaction_type, TransactionType::WalletDeposit);
    assert_eq!(pending.amount, 12_000);
    assert_eq!(pending.description, "Arriendo");
    assert_eq!(pending.property_context, None);
    assert_eq!(h.store.get(keys::PROPERTY_CONTEXT), None);
}

#[tokio::test]
async fn test_reserve_visit_with_huge_price_does_not_overflow() {
    let backend = MockBackend::new();
    backend.on_create(Reply::ok(json!({ "token": "R1", "url": "https://gw/pay" })));
    let h = harness(backend).await;

    let mut property = test_property();
    property.price = Some(i64::MAX);

    h.checkout
        .initiator()
        .reserve_visit(property)
        .await
        .unwrap();

    let creates = h.backend.requests_to(CREATE);
    assert_eq!(creates[0].body["amount"], json!(i64::MAX / 10));
    assert_eq!(
        h.checkout.session().load().map(|p| p.amount),
        Some(i64::MAX / 10)
    );
}
