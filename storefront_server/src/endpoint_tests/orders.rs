use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use serde_json::json;
use storefront_common::Money;
use storefront_engine::{
    db_types::{Json, NewOrder, Order, OrderItem, OrderStatus, PaymentMethod, PaymentStatus, Product},
    order_objects::PricingConfig,
    OrderFlowApi,
};

use super::{
    helpers::{admin_token, customer_token, get_request, patch_request, post_request},
    mocks::MockStoreDb,
};
use crate::routes;

fn phone(stock: i64) -> Product {
    Product {
        id: 1,
        user_id: "user_admin".to_string(),
        name: "Pixel 9".to_string(),
        description: "128GB, Obsidian".to_string(),
        brand: "Google".to_string(),
        price: Money::from_cents(79_900),
        offer_price: Some(Money::from_cents(74_900)),
        stock,
        images: Json(vec!["https://media.example.com/pixel9.jpg".to_string()]),
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
    }
}

fn stored_order(new_order: &NewOrder) -> Order {
    Order {
        id: 42,
        user_id: new_order.user_id.clone(),
        address_id: new_order.address_id,
        subtotal: new_order.subtotal,
        shipping: new_order.shipping,
        tax: new_order.tax,
        total: new_order.total,
        status: new_order.status,
        payment_method: new_order.payment_method,
        payment_status: new_order.payment_status,
        payment_ref: new_order.payment_ref.clone(),
        created_at: Utc.with_ymd_and_hms(2024, 6, 2, 14, 30, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 6, 2, 14, 30, 0).unwrap(),
    }
}

fn register_orders(cfg: &mut ServiceConfig, db: MockStoreDb) {
    let api = OrderFlowApi::new(db, PricingConfig::default());
    cfg.app_data(web::Data::new(api))
        .route("/orders", web::post().to(routes::place_order::<MockStoreDb>))
        .route("/orders/{id}", web::get().to(routes::order_by_id::<MockStoreDb>))
        .route("/orders/{id}/cancel", web::post().to(routes::cancel_order::<MockStoreDb>))
        .route("/orders/{id}/status", web::patch().to(routes::update_order_status::<MockStoreDb>));
}

#[actix_web::test]
async fn place_order_no_token() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(
        "",
        "/orders",
        json!({"address_id": 1, "items": [{"product_id": 1, "quantity": 2}]}),
        configure_checkout_happy,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.contains("No access token"), "unexpected body: {body}");
}

#[actix_web::test]
async fn place_cod_order() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(
        &customer_token(),
        "/orders",
        json!({"address_id": 1, "items": [{"product_id": 1, "quantity": 2}]}),
        configure_checkout_happy,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "unexpected body: {body}");
    let order: serde_json::Value = serde_json::from_str(&body).unwrap();
    // 2 × $749.00 = $1498.00; + $10 shipping + 8% tax ($119.84) = $1627.84
    assert_eq!(order["subtotal"], 149_800);
    assert_eq!(order["shipping"], 1_000);
    assert_eq!(order["tax"], 11_984);
    assert_eq!(order["total"], 162_784);
    assert_eq!(order["status"], "placed");
    assert_eq!(order["payment_status"], "pending");
    assert_eq!(order["payment_method"], "cod");
}

fn configure_checkout_happy(cfg: &mut ServiceConfig) {
    let mut db = MockStoreDb::new();
    db.expect_fetch_product().returning(|_| Ok(Some(phone(3))));
    db.expect_adjust_stock().withf(|&id, &delta| id == 1 && delta == -2).returning(|_, _| Ok(1));
    db.expect_insert_order().returning(|o| Ok(stored_order(&o)));
    db.expect_clear_cart().returning(|_| Ok(()));
    db.expect_fetch_order_items()
        .returning(|_| Ok(vec![OrderItem { id: 1, order_id: 42, product_id: 1, quantity: 2 }]));
    register_orders(cfg, db);
}

#[actix_web::test]
async fn place_order_with_insufficient_stock() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(
        &customer_token(),
        "/orders",
        json!({"address_id": 1, "items": [{"product_id": 1, "quantity": 2}]}),
        configure_checkout_low_stock,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("Pixel 9: requested 2, available 1"), "unexpected body: {body}");
}

fn configure_checkout_low_stock(cfg: &mut ServiceConfig) {
    let mut db = MockStoreDb::new();
    db.expect_fetch_product().returning(|_| Ok(Some(phone(1))));
    // No adjust_stock/insert_order expectations: any stock mutation would fail the test.
    register_orders(cfg, db);
}

#[actix_web::test]
async fn place_order_with_empty_cart() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_request(&customer_token(), "/orders", json!({"address_id": 1, "items": []}), configure_no_calls).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("add items to your cart"), "unexpected body: {body}");
}

fn configure_no_calls(cfg: &mut ServiceConfig) {
    register_orders(cfg, MockStoreDb::new());
}

#[actix_web::test]
async fn cancel_delivered_order_conflicts() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(&customer_token(), "/orders/42/cancel", json!({}), configure_delivered).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("Current status: delivered"), "unexpected body: {body}");
}

fn configure_delivered(cfg: &mut ServiceConfig) {
    let mut db = MockStoreDb::new();
    db.expect_fetch_order().returning(|_| {
        let new_order = NewOrder {
            user_id: "user_2xKq".to_string(),
            address_id: 1,
            items: vec![],
            subtotal: Money::from_cents(149_800),
            shipping: Money::from_cents(1_000),
            tax: Money::from_cents(11_984),
            total: Money::from_cents(162_784),
            status: OrderStatus::Delivered,
            payment_method: PaymentMethod::Cod,
            payment_status: PaymentStatus::Pending,
            payment_ref: None,
        };
        Ok(Some(stored_order(&new_order)))
    });
    // No adjust_stock expectation: restoring stock for a non-cancellable order would fail the test.
    register_orders(cfg, db);
}

#[actix_web::test]
async fn status_change_requires_admin() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        patch_request(&customer_token(), "/orders/42/status", json!({"status": "shipped"}), configure_no_calls).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("Admin privileges required"), "unexpected body: {body}");
}

#[actix_web::test]
async fn admin_can_change_status() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        patch_request(&admin_token(), "/orders/42/status", json!({"status": "shipped"}), configure_status_change).await;
    assert_eq!(status, StatusCode::OK, "unexpected body: {body}");
    let order: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(order["status"], "shipped");
}

fn configure_status_change(cfg: &mut ServiceConfig) {
    let mut db = MockStoreDb::new();
    let processing = NewOrder {
        user_id: "user_2xKq".to_string(),
        address_id: 1,
        items: vec![],
        subtotal: Money::from_cents(149_800),
        shipping: Money::from_cents(1_000),
        tax: Money::from_cents(11_984),
        total: Money::from_cents(162_784),
        status: OrderStatus::Processing,
        payment_method: PaymentMethod::Card,
        payment_status: PaymentStatus::Completed,
        payment_ref: Some("pi_3PQxAbc123".to_string()),
    };
    let before = stored_order(&processing);
    let mut after = before.clone();
    after.status = OrderStatus::Shipped;
    db.expect_fetch_order().returning(move |_| Ok(Some(before.clone())));
    db.expect_update_order_status()
        .withf(|&id, &status| id == 42 && status == OrderStatus::Shipped)
        .returning(move |_, _| Ok(after.clone()));
    // No adjust_stock expectation: only a change into cancelled may touch stock.
    register_orders(cfg, db);
}

#[actix_web::test]
async fn fetch_another_users_order_is_denied() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request(&customer_token(), "/orders/42", configure_foreign_order).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("Access denied"), "unexpected body: {body}");
}

#[actix_web::test]
async fn fetch_another_users_order_as_admin() {
    let _ = env_logger::try_init().ok();
    let token = super::helpers::admin_token();
    let (status, body) = get_request(&token, "/orders/42", configure_foreign_order).await;
    assert_eq!(status, StatusCode::OK, "unexpected body: {body}");
}

fn configure_foreign_order(cfg: &mut ServiceConfig) {
    let mut db = MockStoreDb::new();
    db.expect_fetch_order().returning(|_| {
        let new_order = NewOrder {
            user_id: "user_somebody_else".to_string(),
            address_id: 7,
            items: vec![],
            subtotal: Money::from_cents(79_900),
            shipping: Money::from_cents(1_000),
            tax: Money::from_cents(6_392),
            total: Money::from_cents(87_292),
            status: OrderStatus::Processing,
            payment_method: PaymentMethod::Card,
            payment_status: PaymentStatus::Completed,
            payment_ref: Some("pi_3PQxAbc123".to_string()),
        };
        Ok(Some(stored_order(&new_order)))
    });
    db.expect_fetch_order_items().returning(|_| Ok(vec![]));
    register_orders(cfg, db);
}
