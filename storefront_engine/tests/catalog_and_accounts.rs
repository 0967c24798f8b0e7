//! Catalog CRUD, the delete guard, the default-address invariant and cart handling.

use storefront_common::Money;
use storefront_engine::{
    db_types::{LineItem, NewAddress, NewProduct, OrderStatus, PaymentMethod, ProductUpdate},
    order_objects::{CheckoutRequest, PricingConfig, ProductQueryFilter},
    traits::{AccountManagement, CatalogError, CatalogManagement},
    CatalogApi,
    OrderFlowApi,
    SqliteDatabase,
};

mod support;
use support::{prepare_test_db, seed_customer, seed_phone};

fn test_address(is_default: bool) -> NewAddress {
    NewAddress {
        full_name: "Asha Rai".to_string(),
        phone_number: "+977-1-5551234".to_string(),
        street_address: "48 Lake Side".to_string(),
        city: "Pokhara".to_string(),
        state: "Gandaki".to_string(),
        postal_code: "33700".to_string(),
        is_default,
    }
}

#[tokio::test]
async fn at_most_one_default_address_per_user() {
    let db = prepare_test_db().await;
    let (user, first_id) = seed_customer(&db, "user_addr").await; // seeded address is the default

    let second = db.insert_address(&user, test_address(true)).await.unwrap();
    assert!(second.is_default);

    let addresses = db.fetch_addresses(&user).await.unwrap();
    assert_eq!(addresses.len(), 2);
    let defaults: Vec<_> = addresses.iter().filter(|a| a.is_default).collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].id, second.id);
    assert!(!addresses.iter().find(|a| a.id == first_id).unwrap().is_default);

    // Updating the first one back to default flips the flag again.
    let mut update = test_address(true);
    update.street_address = "12 Hill Road".to_string();
    db.update_address(first_id, &user, update).await.unwrap();
    let addresses = db.fetch_addresses(&user).await.unwrap();
    let defaults: Vec<_> = addresses.iter().filter(|a| a.is_default).collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].id, first_id);
}

#[tokio::test]
async fn address_mutations_are_scoped_to_the_owner() {
    let db = prepare_test_db().await;
    let (user, address_id) = seed_customer(&db, "user_a").await;
    seed_customer(&db, "user_b").await;

    let err = db.update_address(address_id, "user_b", test_address(false)).await.unwrap_err();
    assert!(err.to_string().contains("could not be found"), "unexpected error: {err}");
    let err = db.delete_address(address_id, "user_b").await.unwrap_err();
    assert!(err.to_string().contains("could not be found"), "unexpected error: {err}");
    // The rightful owner can still touch it.
    db.delete_address(address_id, &user).await.unwrap();
}

#[tokio::test]
async fn product_delete_is_blocked_by_open_orders() {
    let db = prepare_test_db().await;
    let (user, address) = seed_customer(&db, "user_guard").await;
    let phone = seed_phone(&db, "Pixel 9", 79_900, None, 5).await;
    let flow = OrderFlowApi::new(db.clone(), PricingConfig::default());

    let order = flow
        .place_order(CheckoutRequest {
            user_id: user.clone(),
            address_id: address,
            items: vec![LineItem { product_id: phone.id, quantity: 1 }],
            payment_method: PaymentMethod::Cod,
            payment_ref: None,
        })
        .await
        .unwrap()
        .order;

    let err = db.delete_product(phone.id).await.expect_err("delete should be blocked");
    assert!(matches!(err, CatalogError::ProductInOpenOrder(ref name) if name == "Pixel 9"), "got {err:?}");

    // Once the order reaches a terminal status the guard lifts.
    flow.advance_order_status(order.id, OrderStatus::Delivered).await.unwrap();
    db.delete_product(phone.id).await.expect("delete should succeed now");
    assert!(db.fetch_product(phone.id).await.unwrap().is_none());
}

#[tokio::test]
async fn listing_supports_search_brand_and_pagination() {
    let db = prepare_test_db().await;
    for i in 0..3 {
        seed_phone(&db, &format!("Pixel {i}"), 59_900 + i * 10_000, None, 5).await;
    }
    db.insert_product(NewProduct {
        user_id: "user_admin".to_string(),
        name: "Galaxy S24".to_string(),
        description: "Flagship, 256GB".to_string(),
        brand: "Samsung".to_string(),
        price: Money::from_cents(109_900),
        offer_price: None,
        stock: 4,
        images: vec!["https://media.example.com/s24.jpg".to_string()],
    })
    .await
    .unwrap();

    let api = CatalogApi::new(db.clone());
    let page = api
        .list_products(ProductQueryFilter { search: Some("pixel".to_string()), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(page.total, 3);

    let page = api
        .list_products(ProductQueryFilter { brand: Some("Samsung".to_string()), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.products[0].name, "Galaxy S24");

    let page = api
        .list_products(ProductQueryFilter { page: 2, limit: 3, ..Default::default() })
        .await
        .unwrap();
    assert_eq!(page.total, 4);
    assert_eq!(page.pages, 2);
    assert_eq!(page.products.len(), 1);
}

#[tokio::test]
async fn partial_update_can_clear_the_offer_price() {
    let db = prepare_test_db().await;
    let phone = seed_phone(&db, "Pixel 9", 79_900, Some(74_900), 5).await;

    let updated = db
        .update_product(phone.id, ProductUpdate { offer_price: Some(None), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(updated.offer_price, None);
    assert_eq!(updated.price, Money::from_cents(79_900));
    assert_eq!(updated.effective_price(), Money::from_cents(79_900));

    let updated = db
        .update_product(phone.id, ProductUpdate { stock: Some(9), ..Default::default() })
        .await
        .unwrap();
    assert_eq!(updated.stock, 9);
    assert_eq!(updated.name, "Pixel 9");
}

#[tokio::test]
async fn cart_is_replaced_wholesale() {
    let db = prepare_test_db().await;
    let (user, _) = seed_customer(&db, "user_cart2").await;
    let a = seed_phone(&db, "Pixel 9", 79_900, None, 5).await;
    let b = seed_phone(&db, "Pixel 8", 59_900, None, 5).await;

    db.replace_cart(&user, &[LineItem { product_id: a.id, quantity: 2 }]).await.unwrap();
    db.replace_cart(
        &user,
        &[LineItem { product_id: a.id, quantity: 1 }, LineItem { product_id: b.id, quantity: 3 }],
    )
    .await
    .unwrap();

    let cart = db.fetch_cart(&user).await.unwrap();
    assert_eq!(cart.len(), 2);
    assert_eq!(cart[0], LineItem { product_id: a.id, quantity: 1 });
    assert_eq!(cart[1], LineItem { product_id: b.id, quantity: 3 });
}

#[tokio::test]
async fn identity_sync_upserts_and_deletes_users() {
    let db = prepare_test_db().await;
    let user = storefront_engine::db_types::NewUser {
        id: "user_sync".to_string(),
        name: "Nisha KC".to_string(),
        email: "nisha@example.com".to_string(),
        avatar_url: String::new(),
    };
    db.upsert_user(user.clone()).await.unwrap();
    let mut renamed = user.clone();
    renamed.name = "Nisha K.C.".to_string();
    db.upsert_user(renamed).await.unwrap();

    let stored = db.fetch_user("user_sync").await.unwrap().unwrap();
    assert_eq!(stored.name, "Nisha K.C.");
    assert_eq!(stored.email, "nisha@example.com");

    db.delete_user("user_sync").await.unwrap();
    assert!(db.fetch_user("user_sync").await.unwrap().is_none());
}
