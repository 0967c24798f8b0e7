use std::time::Duration;

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use gateway_client::GatewayApi;
use storefront_engine::{AccountApi, CatalogApi, OrderFlowApi, ReceiptApi, SqliteDatabase};

use crate::{
    config::{ServerConfig, WebhookConfig},
    errors::ServerError,
    routes,
    routes::health,
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let srv = create_server_instance(config, db)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(config: ServerConfig, db: SqliteDatabase) -> Result<Server, ServerError> {
    let gateway_api =
        GatewayApi::new(config.gateway.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let orders_api = OrderFlowApi::new(db.clone(), config.pricing.clone());
        let catalog_api = CatalogApi::new(db.clone());
        let accounts_api = AccountApi::new(db.clone());
        let receipts_api = ReceiptApi::new(db.clone());
        let webhook_config = WebhookConfig::from_config(&config);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("sfs::access_log"))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(catalog_api))
            .app_data(web::Data::new(accounts_api))
            .app_data(web::Data::new(receipts_api))
            .app_data(web::Data::new(gateway_api.clone()))
            .app_data(web::Data::new(config.auth.clone()))
            .app_data(web::Data::new(config.pricing.clone()))
            .app_data(web::Data::new(webhook_config));
        // The authenticated storefront API. Identity checks happen in the JwtClaims extractor; role checks in the
        // handlers themselves.
        let api_scope = web::scope("/api")
            .route("/products", web::get().to(routes::list_products::<SqliteDatabase>))
            .route("/products", web::post().to(routes::add_product::<SqliteDatabase>))
            .route("/products/all", web::get().to(routes::all_products::<SqliteDatabase>))
            .route("/products/{id}", web::get().to(routes::product::<SqliteDatabase>))
            .route("/products/{id}", web::put().to(routes::update_product::<SqliteDatabase>))
            .route("/products/{id}", web::delete().to(routes::delete_product::<SqliteDatabase>))
            .route("/cart", web::get().to(routes::get_cart::<SqliteDatabase>))
            .route("/cart", web::post().to(routes::update_cart::<SqliteDatabase>))
            .route("/addresses", web::get().to(routes::my_addresses::<SqliteDatabase>))
            .route("/addresses", web::post().to(routes::add_address::<SqliteDatabase>))
            .route("/addresses/{id}", web::put().to(routes::update_address::<SqliteDatabase>))
            .route("/addresses/{id}", web::delete().to(routes::delete_address::<SqliteDatabase>))
            .route("/orders", web::post().to(routes::place_order::<SqliteDatabase>))
            .route("/orders", web::get().to(routes::my_orders::<SqliteDatabase>))
            .route("/orders/all", web::get().to(routes::all_orders::<SqliteDatabase>))
            .route("/orders/{id}", web::get().to(routes::order_by_id::<SqliteDatabase>))
            .route("/orders/{id}/cancel", web::post().to(routes::cancel_order::<SqliteDatabase>))
            .route("/orders/{id}/status", web::patch().to(routes::update_order_status::<SqliteDatabase>))
            .route("/orders/{id}/payment", web::put().to(routes::update_order_payment::<SqliteDatabase>))
            .route("/payment/intent", web::post().to(routes::create_payment_intent::<SqliteDatabase>))
            .route("/receipts", web::get().to(routes::receipts::<SqliteDatabase>))
            .route("/receipts/order/{id}", web::post().to(routes::create_receipt::<SqliteDatabase>))
            .route("/user", web::get().to(routes::user_data::<SqliteDatabase>));
        // Signed webhook deliveries from the payment gateway and the identity provider. These verify their own
        // signatures; no JWT is involved.
        let webhook_scope = web::scope("/webhook")
            .route("/payment", web::post().to(routes::payment_webhook::<SqliteDatabase>))
            .route("/identity", web::post().to(routes::identity_webhook::<SqliteDatabase>));
        app.service(health).service(api_scope).service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
