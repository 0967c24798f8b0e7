//! End-to-end order flow tests against a real (throwaway) SQLite database. These pin the contract of checkout,
//! cancellation, payment reconciliation and the stock ledger.

use storefront_common::Money;
use storefront_engine::{
    db_types::{LineItem, OrderStatus, PaymentMethod, PaymentStatus, ProductUpdate},
    order_objects::{CheckoutRequest, OrderQueryFilter, PricingConfig},
    traits::{AccountManagement, CatalogManagement, OrderFlowError, StorefrontDatabase},
    OrderFlowApi,
    SqliteDatabase,
};

mod support;
use support::{prepare_test_db, seed_customer, seed_phone};

fn api(db: &SqliteDatabase) -> OrderFlowApi<SqliteDatabase> {
    OrderFlowApi::new(db.clone(), PricingConfig::default())
}

fn checkout(
    user_id: &str,
    address_id: i64,
    items: Vec<LineItem>,
    payment_method: PaymentMethod,
    payment_ref: Option<&str>,
) -> CheckoutRequest {
    CheckoutRequest {
        user_id: user_id.to_string(),
        address_id,
        items,
        payment_method,
        payment_ref: payment_ref.map(String::from),
    }
}

async fn stock_of(db: &SqliteDatabase, product_id: i64) -> i64 {
    db.fetch_product(product_id).await.unwrap().expect("product should exist").stock
}

#[tokio::test]
async fn totals_are_computed_once_from_creation_time_prices() {
    let db = prepare_test_db().await;
    let (user, address) = seed_customer(&db, "user_totals").await;
    let pixel = seed_phone(&db, "Pixel 9", 79_900, None, 3).await;
    let galaxy = seed_phone(&db, "Galaxy A55", 49_900, Some(44_900), 5).await;

    let items = vec![
        LineItem { product_id: pixel.id, quantity: 1 },
        LineItem { product_id: galaxy.id, quantity: 2 },
    ];
    let order = api(&db)
        .place_order(checkout(&user, address, items, PaymentMethod::Cod, None))
        .await
        .expect("checkout should succeed")
        .order;

    // subtotal uses the offer price where present: 79900 + 2 × 44900
    assert_eq!(order.subtotal, Money::from_cents(169_700));
    assert_eq!(order.shipping, Money::from_cents(1_000));
    // 8% of 169700 = 13576
    assert_eq!(order.tax, Money::from_cents(13_576));
    assert_eq!(order.total, order.subtotal + order.shipping + order.tax);
    assert_eq!(stock_of(&db, pixel.id).await, 2);
    assert_eq!(stock_of(&db, galaxy.id).await, 3);

    // Repricing the product later must not change the stored totals.
    db.update_product(galaxy.id, ProductUpdate { offer_price: Some(None), ..Default::default() }).await.unwrap();
    let unchanged = db.fetch_order(order.id).await.unwrap().unwrap();
    assert_eq!(unchanged.subtotal, Money::from_cents(169_700));
    assert_eq!(unchanged.total, order.total);
}

#[tokio::test]
async fn checkout_decrements_stock() {
    let db = prepare_test_db().await;
    let (user, address) = seed_customer(&db, "user_stock").await;
    let phone = seed_phone(&db, "Pixel 9a", 49_900, None, 3).await;

    api(&db)
        .place_order(checkout(&user, address, vec![LineItem { product_id: phone.id, quantity: 2 }], PaymentMethod::Cod, None))
        .await
        .expect("checkout should succeed");
    assert_eq!(stock_of(&db, phone.id).await, 1);
}

#[tokio::test]
async fn insufficient_stock_rejects_whole_order_and_lists_every_offender() {
    let db = prepare_test_db().await;
    let (user, address) = seed_customer(&db, "user_short").await;
    let scarce = seed_phone(&db, "Pixel Fold", 179_900, None, 1).await;
    let gone = seed_phone(&db, "Pixel 8", 59_900, None, 0).await;
    let plenty = seed_phone(&db, "Pixel 9a", 49_900, None, 10).await;

    let items = vec![
        LineItem { product_id: scarce.id, quantity: 2 },
        LineItem { product_id: gone.id, quantity: 1 },
        LineItem { product_id: plenty.id, quantity: 1 },
    ];
    let err = api(&db)
        .place_order(checkout(&user, address, items, PaymentMethod::Cod, None))
        .await
        .expect_err("checkout should be rejected");

    match &err {
        OrderFlowError::InsufficientStock(shortfalls) => {
            assert_eq!(shortfalls.len(), 2);
            assert_eq!(shortfalls[0].product_name, "Pixel Fold");
            assert_eq!(shortfalls[0].requested, 2);
            assert_eq!(shortfalls[0].available, 1);
            assert_eq!(shortfalls[1].product_name, "Pixel 8");
        },
        other => panic!("Expected InsufficientStock, got {other:?}"),
    }
    assert!(err.to_string().contains("available 1"), "unexpected message: {err}");
    // All-or-nothing: no stock anywhere changed, including the line that had plenty.
    assert_eq!(stock_of(&db, scarce.id).await, 1);
    assert_eq!(stock_of(&db, gone.id).await, 0);
    assert_eq!(stock_of(&db, plenty.id).await, 10);
    // And no order was written.
    let orders = db.search_orders(OrderQueryFilter::for_user(user.as_str())).await.unwrap();
    assert!(orders.is_empty());
}

#[tokio::test]
async fn missing_product_fails_checkout() {
    let db = prepare_test_db().await;
    let (user, address) = seed_customer(&db, "user_missing").await;
    let err = api(&db)
        .place_order(checkout(&user, address, vec![LineItem { product_id: 999, quantity: 1 }], PaymentMethod::Cod, None))
        .await
        .expect_err("checkout should be rejected");
    assert!(matches!(err, OrderFlowError::ProductNotFound(999)));
}

#[tokio::test]
async fn checkout_clears_the_cart() {
    let db = prepare_test_db().await;
    let (user, address) = seed_customer(&db, "user_cart").await;
    let phone = seed_phone(&db, "Pixel 9", 79_900, None, 5).await;
    let line = LineItem { product_id: phone.id, quantity: 1 };
    db.replace_cart(&user, &[line]).await.unwrap();
    assert_eq!(db.fetch_cart(&user).await.unwrap().len(), 1);

    api(&db).place_order(checkout(&user, address, vec![line], PaymentMethod::Cod, None)).await.unwrap();
    assert!(db.fetch_cart(&user).await.unwrap().is_empty());
}

#[tokio::test]
async fn cod_cancel_restores_stock_and_leaves_payment_pending() {
    let db = prepare_test_db().await;
    let (user, address) = seed_customer(&db, "user_cancel").await;
    let phone = seed_phone(&db, "Pixel 9", 79_900, None, 3).await;
    let api = api(&db);

    let order = api
        .place_order(checkout(&user, address, vec![LineItem { product_id: phone.id, quantity: 2 }], PaymentMethod::Cod, None))
        .await
        .unwrap()
        .order;
    assert_eq!(order.status, OrderStatus::Placed);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(stock_of(&db, phone.id).await, 1);

    let cancelled = api.cancel_order(order.id, &user).await.expect("cancel should succeed");
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(cancelled.payment_status, PaymentStatus::Pending);
    // Post-cancel stock equals pre-create stock exactly.
    assert_eq!(stock_of(&db, phone.id).await, 3);
}

#[tokio::test]
async fn card_cancel_marks_payment_failed() {
    let db = prepare_test_db().await;
    let (user, address) = seed_customer(&db, "user_card_cancel").await;
    let phone = seed_phone(&db, "Pixel 9", 79_900, None, 2).await;
    let api = api(&db);

    let order = api
        .place_order(checkout(
            &user,
            address,
            vec![LineItem { product_id: phone.id, quantity: 1 }],
            PaymentMethod::Card,
            Some("pi_3PQxAbc123"),
        ))
        .await
        .unwrap()
        .order;
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(order.payment_status, PaymentStatus::Completed);
    assert_eq!(order.payment_ref.as_deref(), Some("pi_3PQxAbc123"));

    let cancelled = api.cancel_order(order.id, &user).await.unwrap();
    assert_eq!(cancelled.payment_status, PaymentStatus::Failed);
    assert_eq!(stock_of(&db, phone.id).await, 2);
}

#[tokio::test]
async fn second_cancel_conflicts_and_does_not_double_restore() {
    let db = prepare_test_db().await;
    let (user, address) = seed_customer(&db, "user_double").await;
    let phone = seed_phone(&db, "Pixel 9", 79_900, None, 3).await;
    let api = api(&db);

    let order = api
        .place_order(checkout(&user, address, vec![LineItem { product_id: phone.id, quantity: 2 }], PaymentMethod::Cod, None))
        .await
        .unwrap()
        .order;
    api.cancel_order(order.id, &user).await.unwrap();
    assert_eq!(stock_of(&db, phone.id).await, 3);

    let err = api.cancel_order(order.id, &user).await.expect_err("second cancel should fail");
    assert!(matches!(err, OrderFlowError::NotCancellable(OrderStatus::Cancelled)), "got {err:?}");
    assert_eq!(stock_of(&db, phone.id).await, 3);
}

#[tokio::test]
async fn cancel_requires_ownership() {
    let db = prepare_test_db().await;
    let (user, address) = seed_customer(&db, "user_owner").await;
    seed_customer(&db, "user_intruder").await;
    let phone = seed_phone(&db, "Pixel 9", 79_900, None, 3).await;
    let api = api(&db);

    let order = api
        .place_order(checkout(&user, address, vec![LineItem { product_id: phone.id, quantity: 1 }], PaymentMethod::Cod, None))
        .await
        .unwrap()
        .order;
    let err = api.cancel_order(order.id, "user_intruder").await.expect_err("foreign cancel should fail");
    assert!(matches!(err, OrderFlowError::OwnershipViolation));
    assert_eq!(stock_of(&db, phone.id).await, 2);
}

#[tokio::test]
async fn seller_cancellation_restores_stock_and_ordering_is_advisory() {
    let db = prepare_test_db().await;
    let (user, address) = seed_customer(&db, "user_seller").await;
    let phone = seed_phone(&db, "Pixel 9", 79_900, None, 4).await;
    let api = api(&db);

    let order = api
        .place_order(checkout(&user, address, vec![LineItem { product_id: phone.id, quantity: 3 }], PaymentMethod::Cod, None))
        .await
        .unwrap()
        .order;

    // The enum ordering is advisory: jumping straight to delivered, and back, is not rejected.
    let jumped = api.advance_order_status(order.id, OrderStatus::Delivered).await.unwrap();
    assert_eq!(jumped.status, OrderStatus::Delivered);
    let regressed = api.advance_order_status(order.id, OrderStatus::Placed).await.unwrap();
    assert_eq!(regressed.status, OrderStatus::Placed);
    assert_eq!(stock_of(&db, phone.id).await, 1);

    // Cancelling via the seller path restores stock, once.
    let cancelled = api.advance_order_status(order.id, OrderStatus::Cancelled).await.unwrap();
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert_eq!(stock_of(&db, phone.id).await, 4);
    let again = api.advance_order_status(order.id, OrderStatus::Cancelled).await.unwrap();
    assert_eq!(again.status, OrderStatus::Cancelled);
    assert_eq!(stock_of(&db, phone.id).await, 4);
}

#[tokio::test]
async fn webhook_success_is_a_noop_on_an_already_processing_card_order() {
    let db = prepare_test_db().await;
    let (user, address) = seed_customer(&db, "user_webhook").await;
    let phone = seed_phone(&db, "Pixel 9", 79_900, None, 2).await;
    let api = api(&db);

    let order = api
        .place_order(checkout(
            &user,
            address,
            vec![LineItem { product_id: phone.id, quantity: 1 }],
            PaymentMethod::Card,
            Some("pi_3PQxAbc123"),
        ))
        .await
        .unwrap()
        .order;
    assert_eq!(order.status, OrderStatus::Processing);
    assert_eq!(order.payment_status, PaymentStatus::Completed);

    // The asynchronous confirmation for the same payment arrives afterwards.
    let updated = api.payment_succeeded(order.id, "pi_3PQxAbc123").await.unwrap();
    assert_eq!(updated.status, OrderStatus::Processing);
    assert_eq!(updated.payment_status, PaymentStatus::Completed);
}

#[tokio::test]
async fn payment_failure_does_not_restore_stock() {
    // The documented window: stock was decremented at creation, and a later payment failure leaves it decremented.
    // Only an explicit cancellation restores stock.
    let db = prepare_test_db().await;
    let (user, address) = seed_customer(&db, "user_window").await;
    let phone = seed_phone(&db, "Pixel 9", 79_900, None, 2).await;
    let api = api(&db);

    let order = api
        .place_order(checkout(
            &user,
            address,
            vec![LineItem { product_id: phone.id, quantity: 1 }],
            PaymentMethod::Card,
            Some("pi_3PQxAbc123"),
        ))
        .await
        .unwrap()
        .order;
    let updated = api.payment_failed(order.id).await.unwrap();
    assert_eq!(updated.payment_status, PaymentStatus::Failed);
    assert_eq!(updated.status, OrderStatus::Processing);
    assert_eq!(stock_of(&db, phone.id).await, 1);
}

#[tokio::test]
async fn client_confirmation_advances_placed_orders_only() {
    let db = prepare_test_db().await;
    let (user, address) = seed_customer(&db, "user_confirm").await;
    let phone = seed_phone(&db, "Pixel 9", 79_900, None, 5).await;
    let api = api(&db);

    let order = api
        .place_order(checkout(&user, address, vec![LineItem { product_id: phone.id, quantity: 1 }], PaymentMethod::Cod, None))
        .await
        .unwrap()
        .order;
    assert_eq!(order.status, OrderStatus::Placed);

    let confirmed = api.confirm_payment(order.id, &user, "pi_3PQxAbc999").await.unwrap();
    assert_eq!(confirmed.status, OrderStatus::Processing);
    assert_eq!(confirmed.payment_status, PaymentStatus::Completed);
    assert_eq!(confirmed.payment_method, PaymentMethod::Card);
    assert_eq!(confirmed.payment_ref.as_deref(), Some("pi_3PQxAbc999"));

    // A shipped order's status is left alone by a late confirmation.
    api.advance_order_status(order.id, OrderStatus::Shipped).await.unwrap();
    let late = api.confirm_payment(order.id, &user, "pi_3PQxAbc999").await.unwrap();
    assert_eq!(late.status, OrderStatus::Shipped);
}

/// Documents the known stock race rather than hiding it: the admission check and the decrement are separate atomic
/// steps with no cross-product transaction, so two checkouts competing for the last unit can both pass admission and
/// both decrement. This is the interleaving both requests experience under concurrency, replayed deterministically.
#[tokio::test]
async fn concurrent_checkouts_can_drive_stock_negative() {
    let db = prepare_test_db().await;
    let phone = seed_phone(&db, "Pixel 9", 79_900, None, 1).await;

    // Both requests read the stock level before either decrements: both admission checks pass.
    let seen_by_a = stock_of(&db, phone.id).await;
    let seen_by_b = stock_of(&db, phone.id).await;
    assert!(seen_by_a >= 1 && seen_by_b >= 1);

    // Both then apply their (individually atomic) decrements.
    db.adjust_stock(phone.id, -1).await.unwrap();
    let final_stock = db.adjust_stock(phone.id, -1).await.unwrap();

    // Stock is now negative. A design defect inherited from the per-document storage model; fixing it would take a
    // conditional decrement with batch rollback (see DESIGN.md).
    assert_eq!(final_stock, -1);
}
