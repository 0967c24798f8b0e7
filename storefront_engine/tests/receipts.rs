//! Receipt snapshot tests: lazy single generation, per-day numbering, and generation-time product data.

use storefront_common::Money;
use storefront_engine::{
    db_types::{LineItem, OrderStatus, PaymentMethod},
    order_objects::{CheckoutRequest, PricingConfig},
    traits::{AccountManagement, ReceiptError},
    OrderFlowApi,
    ReceiptApi,
    SqliteDatabase,
};

mod support;
use support::{prepare_test_db, seed_customer, seed_phone};

async fn place_cod_order(db: &SqliteDatabase, user: &str, address: i64, product_id: i64, quantity: i64) -> i64 {
    OrderFlowApi::new(db.clone(), PricingConfig::default())
        .place_order(CheckoutRequest {
            user_id: user.to_string(),
            address_id: address,
            items: vec![LineItem { product_id, quantity }],
            payment_method: PaymentMethod::Cod,
            payment_ref: None,
        })
        .await
        .expect("checkout should succeed")
        .order
        .id
}

#[tokio::test]
async fn receipt_generation_is_idempotent() {
    let db = prepare_test_db().await;
    let (user, address) = seed_customer(&db, "user_receipt").await;
    let phone = seed_phone(&db, "Pixel 9", 79_900, Some(74_900), 5).await;
    let order_id = place_cod_order(&db, &user, address, phone.id, 2).await;
    let api = ReceiptApi::new(db.clone());

    let first = api.receipt_for_order(order_id, &user).await.expect("first generation should succeed");
    let second = api.receipt_for_order(order_id, &user).await.expect("second call should succeed");

    assert_eq!(first.receipt.id, second.receipt.id);
    assert_eq!(first.receipt.receipt_number, second.receipt.receipt_number);
    assert_eq!(first.receipt.generated_at, second.receipt.generated_at);
    assert_eq!(first.items.len(), second.items.len());
    assert_eq!(first.items[0].unit_price, second.items[0].unit_price);
}

#[tokio::test]
async fn receipt_numbers_are_sequential_within_a_day() {
    let db = prepare_test_db().await;
    let (user, address) = seed_customer(&db, "user_numbers").await;
    let phone = seed_phone(&db, "Pixel 9", 79_900, None, 10).await;
    let api = ReceiptApi::new(db.clone());

    let first_order = place_cod_order(&db, &user, address, phone.id, 1).await;
    let second_order = place_cod_order(&db, &user, address, phone.id, 1).await;
    let first = api.receipt_for_order(first_order, &user).await.unwrap().receipt;
    let second = api.receipt_for_order(second_order, &user).await.unwrap().receipt;

    assert!(first.receipt_number.starts_with("RCP-"), "got {}", first.receipt_number);
    assert!(first.receipt_number.ends_with("-0001"), "got {}", first.receipt_number);
    assert!(second.receipt_number.ends_with("-0002"), "got {}", second.receipt_number);
}

#[tokio::test]
async fn receipt_snapshots_financials_and_billing() {
    let db = prepare_test_db().await;
    let (user, address) = seed_customer(&db, "user_snapshot").await;
    let phone = seed_phone(&db, "Pixel 9", 79_900, Some(74_900), 5).await;
    let order_id = place_cod_order(&db, &user, address, phone.id, 2).await;

    let details = ReceiptApi::new(db.clone()).receipt_for_order(order_id, &user).await.unwrap();
    let receipt = &details.receipt;
    assert_eq!(receipt.subtotal, Money::from_cents(149_800));
    assert_eq!(receipt.total, receipt.subtotal + receipt.shipping + receipt.tax);
    assert_eq!(receipt.customer_name, "Asha Rai");
    assert_eq!(receipt.city, "Kathmandu");
    assert_eq!(details.items[0].product_name, "Pixel 9");
    assert_eq!(details.items[0].unit_price, Money::from_cents(74_900));
    assert_eq!(details.items[0].line_total, Money::from_cents(149_800));
}

#[tokio::test]
async fn receipt_after_product_deletion_renders_placeholder_lines() {
    let db = prepare_test_db().await;
    let (user, address) = seed_customer(&db, "user_deleted_product").await;
    let phone = seed_phone(&db, "Pixel 8", 59_900, None, 3).await;
    let order_id = place_cod_order(&db, &user, address, phone.id, 1).await;

    // The order must reach a terminal state before the product can be deleted.
    let flow = OrderFlowApi::new(db.clone(), PricingConfig::default());
    flow.advance_order_status(order_id, OrderStatus::Delivered).await.unwrap();
    use storefront_engine::traits::CatalogManagement;
    db.delete_product(phone.id).await.expect("delete should succeed once the order is terminal");

    let details = ReceiptApi::new(db.clone()).receipt_for_order(order_id, &user).await.unwrap();
    assert_eq!(details.items[0].product_name, "Unknown Product");
    assert_eq!(details.items[0].unit_price, Money::from_cents(0));
    // The order-level financials were snapshotted at creation and are unaffected.
    assert_eq!(details.receipt.subtotal, Money::from_cents(59_900));
}

#[tokio::test]
async fn receipt_requires_ownership_and_related_records() {
    let db = prepare_test_db().await;
    let (user, address) = seed_customer(&db, "user_strict").await;
    seed_customer(&db, "user_other").await;
    let phone = seed_phone(&db, "Pixel 9", 79_900, None, 3).await;
    let order_id = place_cod_order(&db, &user, address, phone.id, 1).await;
    let api = ReceiptApi::new(db.clone());

    let err = api.receipt_for_order(order_id, "user_other").await.expect_err("foreign receipt should fail");
    assert!(matches!(err, ReceiptError::OwnershipViolation));

    let err = api.receipt_for_order(9_999, &user).await.expect_err("unknown order should fail");
    assert!(matches!(err, ReceiptError::OrderNotFound(9_999)));

    // A deleted delivery address makes generation impossible (and is reported as such).
    db.delete_address(address, &user).await.unwrap();
    let err = api.receipt_for_order(order_id, &user).await.expect_err("missing address should fail");
    assert!(matches!(err, ReceiptError::AddressNotFound(_)));
}
