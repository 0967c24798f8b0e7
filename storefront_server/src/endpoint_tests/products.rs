use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use serde_json::json;
use storefront_common::Money;
use storefront_engine::{
    db_types::{Json, Product},
    traits::CatalogError,
    CatalogApi,
};

use super::{
    helpers::{admin_token, customer_token, get_request, post_request},
    mocks::MockStoreDb,
};
use crate::routes;

fn phone(id: i64, name: &str) -> Product {
    Product {
        id,
        user_id: "user_admin".to_string(),
        name: name.to_string(),
        description: "Flagship".to_string(),
        brand: "Samsung".to_string(),
        price: Money::from_cents(109_900),
        offer_price: None,
        stock: 12,
        images: Json(vec!["https://media.example.com/s24.jpg".to_string()]),
        created_at: Utc.with_ymd_and_hms(2024, 4, 20, 10, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 4, 20, 10, 0, 0).unwrap(),
    }
}

fn register_products(cfg: &mut ServiceConfig, db: MockStoreDb) {
    let api = CatalogApi::new(db);
    cfg.app_data(web::Data::new(api))
        .route("/products", web::get().to(routes::list_products::<MockStoreDb>))
        .route("/products", web::post().to(routes::add_product::<MockStoreDb>))
        .route("/products/{id}", web::delete().to(routes::delete_product::<MockStoreDb>));
}

#[actix_web::test]
async fn listing_is_public() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("", "/products?search=galaxy&page=1", configure_listing).await;
    assert_eq!(status, StatusCode::OK);
    let page: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(page["total"], 2);
    assert_eq!(page["products"].as_array().unwrap().len(), 2);
}

fn configure_listing(cfg: &mut ServiceConfig) {
    let mut db = MockStoreDb::new();
    db.expect_search_products()
        .withf(|filter| filter.search.as_deref() == Some("galaxy") && filter.page == 1)
        .returning(|_| Ok((vec![phone(1, "Galaxy S24"), phone(2, "Galaxy A55")], 2)));
    register_products(cfg, db);
}

#[actix_web::test]
async fn add_product_requires_admin() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(
        &customer_token(),
        "/products",
        json!({
            "name": "Galaxy S24", "description": "Flagship", "brand": "Samsung",
            "price": 109_900, "stock": 12, "images": ["https://media.example.com/s24.jpg"]
        }),
        configure_no_calls,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("Admin privileges required"), "unexpected body: {body}");
}

fn configure_no_calls(cfg: &mut ServiceConfig) {
    register_products(cfg, MockStoreDb::new());
}

#[actix_web::test]
async fn add_product_as_admin() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(
        &admin_token(),
        "/products",
        json!({
            "name": "Galaxy S24", "description": "Flagship", "brand": "Samsung",
            "price": 109_900, "stock": 12, "images": ["https://media.example.com/s24.jpg"]
        }),
        configure_insert,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "unexpected body: {body}");
    let product: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(product["name"], "Galaxy S24");
}

fn configure_insert(cfg: &mut ServiceConfig) {
    let mut db = MockStoreDb::new();
    db.expect_insert_product()
        .withf(|p| p.name == "Galaxy S24" && p.stock == 12 && p.user_id == "user_admin")
        .returning(|_| Ok(phone(1, "Galaxy S24")));
    register_products(cfg, db);
}

#[actix_web::test]
async fn add_product_rejects_negative_stock() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request(
        &admin_token(),
        "/products",
        json!({
            "name": "Galaxy S24", "description": "Flagship", "brand": "Samsung",
            "price": 109_900, "stock": -3, "images": ["https://media.example.com/s24.jpg"]
        }),
        configure_no_calls,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("Stock cannot be negative"), "unexpected body: {body}");
}

#[actix_web::test]
async fn delete_product_in_open_order_conflicts() {
    let _ = env_logger::try_init().ok();
    let (status, body) = super::helpers::delete_request(&admin_token(), "/products/1", configure_delete_blocked).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.contains("part of an active order"), "unexpected body: {body}");
}

fn configure_delete_blocked(cfg: &mut ServiceConfig) {
    let mut db = MockStoreDb::new();
    db.expect_delete_product()
        .returning(|_| Err(CatalogError::ProductInOpenOrder("Galaxy S24".to_string())));
    register_products(cfg, db);
}
