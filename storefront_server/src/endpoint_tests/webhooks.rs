use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use serde_json::json;
use storefront_common::{Money, Secret};
use storefront_engine::{
    db_types::{Order, OrderStatus, PaymentMethod, PaymentStatus},
    order_objects::PricingConfig,
    OrderFlowApi,
};

use super::{helpers::post_raw_request, mocks::MockStoreDb};
use crate::{
    config::WebhookConfig,
    routes,
    signed_events::{sign_event, GATEWAY_SIGNATURE_HEADER},
};

const WEBHOOK_SECRET: &str = "whsec_endpoint_test";

fn paid_order(payment_status: PaymentStatus, status: OrderStatus) -> Order {
    Order {
        id: 42,
        user_id: "user_2xKq".to_string(),
        address_id: 1,
        subtotal: Money::from_cents(149_800),
        shipping: Money::from_cents(1_000),
        tax: Money::from_cents(11_984),
        total: Money::from_cents(162_784),
        status,
        payment_method: PaymentMethod::Card,
        payment_status,
        payment_ref: Some("pi_3PQxAbc123".to_string()),
        created_at: Utc.with_ymd_and_hms(2024, 6, 2, 14, 30, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 6, 2, 14, 35, 0).unwrap(),
    }
}

fn success_event() -> Vec<u8> {
    json!({
        "type": "payment_intent.succeeded",
        "data": { "object": {
            "id": "pi_3PQxAbc123",
            "amount": 162_784,
            "metadata": { "order_id": 42, "user_id": "user_2xKq" }
        }}
    })
    .to_string()
    .into_bytes()
}

fn failure_event() -> Vec<u8> {
    json!({
        "type": "payment_intent.payment_failed",
        "data": { "object": {
            "id": "pi_3PQxAbc123",
            "amount": 162_784,
            "metadata": { "order_id": 42, "user_id": "user_2xKq" }
        }}
    })
    .to_string()
    .into_bytes()
}

fn register_webhook(cfg: &mut ServiceConfig, db: MockStoreDb) {
    let api = OrderFlowApi::new(db, PricingConfig::default());
    let config = WebhookConfig {
        gateway_secret: Secret::new(WEBHOOK_SECRET.to_string()),
        identity_secret: Secret::new("whsec_identity".to_string()),
    };
    cfg.app_data(web::Data::new(api))
        .app_data(web::Data::new(config))
        .route("/webhook/payment", web::post().to(routes::payment_webhook::<MockStoreDb>));
}

#[actix_web::test]
async fn signed_success_event_marks_order_paid() {
    let _ = env_logger::try_init().ok();
    let body = success_event();
    let header = sign_event(&body, WEBHOOK_SECRET, Utc::now().timestamp());
    let (status, response) = post_raw_request(
        "/webhook/payment",
        &[(GATEWAY_SIGNATURE_HEADER, header)],
        body,
        configure_success,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(response.contains("\"success\":true"), "unexpected body: {response}");
}

fn configure_success(cfg: &mut ServiceConfig) {
    let mut db = MockStoreDb::new();
    db.expect_update_payment_state()
        .withf(|&id, update| {
            id == 42
                && update.payment_status == Some(PaymentStatus::Completed)
                && update.order_status == Some(OrderStatus::Processing)
                && update.payment_ref.as_deref() == Some("pi_3PQxAbc123")
        })
        .returning(|_, _| Ok(paid_order(PaymentStatus::Completed, OrderStatus::Processing)));
    register_webhook(cfg, db);
}

#[actix_web::test]
async fn signed_failure_event_touches_payment_status_only() {
    let _ = env_logger::try_init().ok();
    let body = failure_event();
    let header = sign_event(&body, WEBHOOK_SECRET, Utc::now().timestamp());
    let (status, response) = post_raw_request(
        "/webhook/payment",
        &[(GATEWAY_SIGNATURE_HEADER, header)],
        body,
        configure_failure,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(response.contains("\"success\":true"), "unexpected body: {response}");
}

fn configure_failure(cfg: &mut ServiceConfig) {
    let mut db = MockStoreDb::new();
    db.expect_update_payment_state()
        .withf(|&id, update| {
            id == 42
                && update.payment_status == Some(PaymentStatus::Failed)
                && update.order_status.is_none()
                && update.payment_ref.is_none()
        })
        .returning(|_, _| Ok(paid_order(PaymentStatus::Failed, OrderStatus::Processing)));
    register_webhook(cfg, db);
}

#[actix_web::test]
async fn bad_signature_is_rejected_without_mutation() {
    let _ = env_logger::try_init().ok();
    let body = success_event();
    let header = sign_event(&body, "the-wrong-secret", Utc::now().timestamp());
    let (status, response) = post_raw_request(
        "/webhook/payment",
        &[(GATEWAY_SIGNATURE_HEADER, header)],
        body,
        configure_untouched,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(response.contains("Invalid signature"), "unexpected body: {response}");
}

#[actix_web::test]
async fn missing_signature_is_rejected() {
    let _ = env_logger::try_init().ok();
    let (status, _) = post_raw_request("/webhook/payment", &[], success_event(), configure_untouched).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

fn configure_untouched(cfg: &mut ServiceConfig) {
    // No expectations: any order mutation fails the test.
    register_webhook(cfg, MockStoreDb::new());
}

//----------------------------------------------  Processing errors are swallowed  -----------------------------------

#[actix_web::test]
async fn processing_failure_is_acknowledged() {
    let _ = env_logger::try_init().ok();
    let body = success_event();
    let header = sign_event(&body, WEBHOOK_SECRET, Utc::now().timestamp());
    let (status, response) = post_raw_request(
        "/webhook/payment",
        &[(GATEWAY_SIGNATURE_HEADER, header)],
        body,
        configure_unknown_order,
    )
    .await;
    // The gateway must still get a 2xx, or it will hammer us with retries for a permanent failure.
    assert_eq!(status, StatusCode::OK);
    assert!(response.contains("\"success\":false"), "unexpected body: {response}");
}

fn configure_unknown_order(cfg: &mut ServiceConfig) {
    let mut db = MockStoreDb::new();
    db.expect_update_payment_state()
        .returning(|id, _| Err(storefront_engine::traits::OrderFlowError::OrderNotFound(id)));
    register_webhook(cfg, db);
}
