use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use serde_json::json;
use storefront_common::Money;
use storefront_engine::{
    db_types::{Order, OrderStatus, PaymentMethod, PaymentStatus, Receipt, ReceiptItem},
    ReceiptApi,
};

use super::{
    helpers::{customer_token, post_request},
    mocks::MockStoreDb,
};
use crate::routes;

fn order(user_id: &str) -> Order {
    Order {
        id: 42,
        user_id: user_id.to_string(),
        address_id: 1,
        subtotal: Money::from_cents(149_800),
        shipping: Money::from_cents(1_000),
        tax: Money::from_cents(11_984),
        total: Money::from_cents(162_784),
        status: OrderStatus::Delivered,
        payment_method: PaymentMethod::Card,
        payment_status: PaymentStatus::Completed,
        payment_ref: Some("pi_3PQxAbc123".to_string()),
        created_at: Utc.with_ymd_and_hms(2024, 6, 2, 14, 30, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap(),
    }
}

fn stored_receipt() -> Receipt {
    Receipt {
        id: 7,
        order_id: 42,
        user_id: "user_2xKq".to_string(),
        receipt_number: "RCP-20240610-0001".to_string(),
        customer_name: "Asha Rai".to_string(),
        customer_email: "asha@example.com".to_string(),
        bill_to_name: "Asha Rai".to_string(),
        street_address: "12 Hill Road".to_string(),
        city: "Kathmandu".to_string(),
        state: "Bagmati".to_string(),
        postal_code: "44600".to_string(),
        phone_number: "+977-1-5551234".to_string(),
        payment_method: PaymentMethod::Card,
        payment_status: PaymentStatus::Completed,
        payment_ref: Some("pi_3PQxAbc123".to_string()),
        subtotal: Money::from_cents(149_800),
        shipping: Money::from_cents(1_000),
        tax: Money::from_cents(11_984),
        total: Money::from_cents(162_784),
        generated_at: Utc.with_ymd_and_hms(2024, 6, 10, 9, 5, 0).unwrap(),
    }
}

fn receipt_items() -> Vec<ReceiptItem> {
    vec![ReceiptItem {
        id: 1,
        receipt_id: 7,
        product_id: 1,
        product_name: "Pixel 9".to_string(),
        quantity: 2,
        unit_price: Money::from_cents(74_900),
        line_total: Money::from_cents(149_800),
    }]
}

fn register_receipts(cfg: &mut ServiceConfig, db: MockStoreDb) {
    let api = ReceiptApi::new(db);
    cfg.app_data(web::Data::new(api))
        .route("/receipts/order/{id}", web::post().to(routes::create_receipt::<MockStoreDb>));
}

#[actix_web::test]
async fn existing_receipt_is_returned_unchanged() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_request(&customer_token(), "/receipts/order/42", json!({}), configure_existing).await;
    assert_eq!(status, StatusCode::OK, "unexpected body: {body}");
    let receipt: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(receipt["receipt_number"], "RCP-20240610-0001");
    assert_eq!(receipt["items"][0]["product_name"], "Pixel 9");
}

fn configure_existing(cfg: &mut ServiceConfig) {
    let mut db = MockStoreDb::new();
    db.expect_fetch_order().returning(|_| Ok(Some(order("user_2xKq"))));
    db.expect_fetch_receipt_for_order().returning(|_| Ok(Some(stored_receipt())));
    db.expect_fetch_receipt_items().returning(|_| Ok(receipt_items()));
    // No insert_receipt expectation: regenerating an existing receipt would fail the test.
    register_receipts(cfg, db);
}

#[actix_web::test]
async fn receipt_for_foreign_order_is_denied() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_request(&customer_token(), "/receipts/order/42", json!({}), configure_foreign).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("Access denied"), "unexpected body: {body}");
}

fn configure_foreign(cfg: &mut ServiceConfig) {
    let mut db = MockStoreDb::new();
    db.expect_fetch_order().returning(|_| Ok(Some(order("user_somebody_else"))));
    register_receipts(cfg, db);
}

#[actix_web::test]
async fn receipt_requires_address_record() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_request(&customer_token(), "/receipts/order/42", json!({}), configure_missing_address).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("Address"), "unexpected body: {body}");
}

fn configure_missing_address(cfg: &mut ServiceConfig) {
    let mut db = MockStoreDb::new();
    db.expect_fetch_order().returning(|_| Ok(Some(order("user_2xKq"))));
    db.expect_fetch_receipt_for_order().returning(|_| Ok(None));
    db.expect_fetch_user().returning(|id| {
        Ok(Some(storefront_engine::db_types::User {
            id: id.to_string(),
            name: "Asha Rai".to_string(),
            email: "asha@example.com".to_string(),
            avatar_url: String::new(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }))
    });
    db.expect_fetch_address().returning(|_| Ok(None));
    register_receipts(cfg, db);
}
