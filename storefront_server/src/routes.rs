//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Handlers are generic over the storage traits, so endpoint tests can run them against mocks. The concrete types
//! are fixed in [`crate::server`] where the routes are registered.

use std::time::Duration;

use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use gateway_client::{GatewayApi, IntentMetadata, NewPaymentIntent};
use log::*;
use storefront_engine::{
    db_types::NewAddress,
    order_objects::{CheckoutRequest, OrderQueryFilter, PricingConfig, ProductQueryFilter},
    traits::{AccountManagement, CatalogManagement, ReceiptManagement, StorefrontDatabase},
    AccountApi,
    CatalogApi,
    OrderFlowApi,
    ReceiptApi,
};

use crate::{
    auth::JwtClaims,
    config::WebhookConfig,
    data_objects::{
        CartResult,
        CartUpdateParams,
        CheckoutParams,
        IntentResult,
        JsonResponse,
        NewIntentParams,
        OrderListQuery,
        PaymentConfirmationParams,
        ProductForm,
        ProductListQuery,
        ProductUpdateForm,
        ReceiptQuery,
        StatusUpdateParams,
    },
    errors::ServerError,
    helpers::validate_postal_code,
    signed_events::{
        verify_signed_event,
        GatewayEvent,
        GatewayEventType,
        IdentityEvent,
        IdentityEventType,
        SignatureError,
        GATEWAY_SIGNATURE_HEADER,
        IDENTITY_SIGNATURE_HEADER,
    },
};

/// How often, and how patiently, the payment-intent endpoint retries an order lookup to absorb the lag between order
/// creation and the client's follow-up call.
const MAX_ORDER_LOOKUP_ATTEMPTS: u32 = 3;
const ORDER_LOOKUP_RETRY_DELAY: Duration = Duration::from_millis(500);

const RECEIPT_LIST_LIMIT: u32 = 50;

// ----------------------------------------------   Health  ----------------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Catalog  ----------------------------------------------------------

/// The public product listing: paginated, with optional free-text search and brand filter. No authentication.
pub async fn list_products<B: CatalogManagement>(
    query: web::Query<ProductListQuery>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let query = query.into_inner();
    trace!("💻️ GET product listing");
    let filter = ProductQueryFilter {
        search: query.search.filter(|s| !s.is_empty()),
        brand: query.brand.filter(|b| !b.is_empty()),
        page: query.page.unwrap_or(1),
        limit: query.limit.unwrap_or(0),
    };
    let page = api.list_products(filter).await?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn product<B: CatalogManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    debug!("💻️ GET product {id} for {}", claims.sub);
    let product = api.product(id).await?;
    Ok(HttpResponse::Ok().json(product))
}

/// The full, unpaginated catalog for the seller dashboard.
pub async fn all_products<B: CatalogManagement>(
    claims: JwtClaims,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    claims.require_admin()?;
    debug!("💻️ GET all products for admin {}", claims.sub);
    let products = api.all_products().await?;
    Ok(HttpResponse::Ok().json(products))
}

pub async fn add_product<B: CatalogManagement>(
    claims: JwtClaims,
    body: web::Json<ProductForm>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    claims.require_admin()?;
    let product = api.add_product(body.into_inner().into_new_product(&claims.sub)).await?;
    info!("💻️ Product \"{}\" added by {}", product.name, claims.sub);
    Ok(HttpResponse::Ok().json(product))
}

pub async fn update_product<B: CatalogManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<ProductUpdateForm>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    claims.require_admin()?;
    let id = path.into_inner();
    debug!("💻️ PUT product {id} by {}", claims.sub);
    let product = api.update_product(id, body.into_inner().into()).await?;
    Ok(HttpResponse::Ok().json(product))
}

pub async fn delete_product<B: CatalogManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<CatalogApi<B>>,
) -> Result<HttpResponse, ServerError> {
    claims.require_admin()?;
    let id = path.into_inner();
    let product = api.delete_product(id).await?;
    info!("💻️ Product \"{}\" deleted by {}", product.name, claims.sub);
    Ok(HttpResponse::Ok().json(JsonResponse::success(format!("Product \"{}\" has been deleted", product.name))))
}

//----------------------------------------------     Cart   ----------------------------------------------------------

pub async fn get_cart<B: AccountManagement>(
    claims: JwtClaims,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ GET cart for {}", claims.sub);
    let items = api.cart(&claims.sub).await?;
    Ok(HttpResponse::Ok().json(CartResult { items }))
}

pub async fn update_cart<B: AccountManagement>(
    claims: JwtClaims,
    body: web::Json<CartUpdateParams>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    trace!("💻️ POST cart for {}", claims.sub);
    api.set_cart(&claims.sub, body.into_inner().items).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Your cart has been updated")))
}

//----------------------------------------------    User    ----------------------------------------------------------

pub async fn user_data<B: AccountManagement>(
    claims: JwtClaims,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET user data for {}", claims.sub);
    let user = api.user(&claims.sub).await?;
    Ok(HttpResponse::Ok().json(user))
}

//----------------------------------------------  Addresses  ---------------------------------------------------------

pub async fn my_addresses<B: AccountManagement>(
    claims: JwtClaims,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET addresses for {}", claims.sub);
    let addresses = api.addresses(&claims.sub).await?;
    Ok(HttpResponse::Ok().json(addresses))
}

fn check_postal_code(address: &NewAddress) -> Result<(), ServerError> {
    if validate_postal_code(&address.postal_code) {
        Ok(())
    } else {
        Err(ServerError::ValidationError(
            "Invalid postal code format. Please enter a valid 5-digit postal code.".to_string(),
        ))
    }
}

pub async fn add_address<B: AccountManagement>(
    claims: JwtClaims,
    body: web::Json<NewAddress>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let address = body.into_inner();
    check_postal_code(&address)?;
    let address = api.add_address(&claims.sub, address).await?;
    debug!("💻️ Address {} added for {}", address.id, claims.sub);
    Ok(HttpResponse::Ok().json(address))
}

pub async fn update_address<B: AccountManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<NewAddress>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let address = body.into_inner();
    check_postal_code(&address)?;
    let address = api.update_address(id, &claims.sub, address).await?;
    Ok(HttpResponse::Ok().json(address))
}

pub async fn delete_address<B: AccountManagement>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<AccountApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    api.delete_address(id, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Your address has been deleted")))
}

//----------------------------------------------   Orders   ----------------------------------------------------------

/// Checkout. Validates stock across the whole cart, prices the order, decrements stock, persists the order and
/// clears the cart. See [`OrderFlowApi::place_order`] for the full contract.
pub async fn place_order<B: StorefrontDatabase>(
    claims: JwtClaims,
    body: web::Json<CheckoutParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let CheckoutParams { address_id, items, payment_method, payment_ref } = body.into_inner();
    debug!("💻️ Checkout request from {} with {} item(s), paying by {payment_method}", claims.sub, items.len());
    let request =
        CheckoutRequest { user_id: claims.sub.clone(), address_id, items, payment_method, payment_ref };
    let order = api.place_order(request).await.map_err(|e| {
        debug!("💻️ Checkout failed for {}. {e}", claims.sub);
        e
    })?;
    Ok(HttpResponse::Ok().json(order))
}

pub async fn my_orders<B: StorefrontDatabase>(
    claims: JwtClaims,
    query: web::Query<OrderListQuery>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET my_orders for {}", claims.sub);
    let mut filter = OrderQueryFilter::for_user(claims.sub.as_str());
    filter.status = query.into_inner().status;
    let orders = api.search_orders(filter).await?;
    Ok(HttpResponse::Ok().json(orders))
}

/// Every order on the system, for the seller dashboard.
pub async fn all_orders<B: StorefrontDatabase>(
    claims: JwtClaims,
    query: web::Query<OrderListQuery>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    claims.require_admin()?;
    debug!("💻️ GET all orders for admin {}", claims.sub);
    let filter = OrderQueryFilter { user_id: None, status: query.into_inner().status };
    let orders = api.search_orders(filter).await?;
    Ok(HttpResponse::Ok().json(orders))
}

/// Fetch a single order. Customers can only see their own orders; admins can see any.
pub async fn order_by_id<B: StorefrontDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ GET order {order_id} for {}", claims.sub);
    let order = api
        .fetch_order(order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id} could not be found")))?;
    if order.order.user_id != claims.sub && !claims.is_admin() {
        debug!("💻️ {} may not view order {order_id}", claims.sub);
        return Err(ServerError::AccessDenied);
    }
    Ok(HttpResponse::Ok().json(order))
}

pub async fn cancel_order<B: StorefrontDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    info!("💻️ Cancel request for order {order_id} from {}", claims.sub);
    let order = api.cancel_order(order_id, &claims.sub).await.map_err(|e| {
        debug!("💻️ Could not cancel order {order_id}. {e}");
        e
    })?;
    Ok(HttpResponse::Ok().json(order))
}

/// Seller-driven status change. A change into `cancelled` restores stock; everything else is a bare field write.
pub async fn update_order_status<B: StorefrontDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<StatusUpdateParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    claims.require_admin()?;
    let order_id = path.into_inner();
    let new_status = body.into_inner().status;
    info!("💻️ Status change request for order {order_id} to {new_status} by {}", claims.sub);
    let order = api.advance_order_status(order_id, new_status).await?;
    Ok(HttpResponse::Ok().json(order))
}

/// The client-confirmed payment path: called by the storefront after the gateway confirms a card payment
/// synchronously.
pub async fn update_order_payment<B: StorefrontDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    body: web::Json<PaymentConfirmationParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    let payment_ref = body.into_inner().payment_ref;
    debug!("💻️ Payment confirmation for order {order_id} from {}", claims.sub);
    let order = api.confirm_payment(order_id, &claims.sub, &payment_ref).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------  Payments  ----------------------------------------------------------

/// Create a payment intent with the external gateway for an existing order.
///
/// The order lookup is retried a couple of times: the client calls this immediately after checkout, and the order
/// row may not be visible yet on a different pool connection. The client-supplied amount must match the order total
/// exactly before anything is sent to the gateway.
pub async fn create_payment_intent<B: StorefrontDatabase>(
    claims: JwtClaims,
    body: web::Json<NewIntentParams>,
    api: web::Data<OrderFlowApi<B>>,
    gateway: web::Data<GatewayApi>,
    pricing: web::Data<PricingConfig>,
) -> Result<HttpResponse, ServerError> {
    let NewIntentParams { order_id, amount } = body.into_inner();
    if amount <= 0 {
        return Err(ServerError::ValidationError("Invalid order data - a positive amount is required".to_string()));
    }
    debug!("💻️ Payment intent request for order {order_id} from {}", claims.sub);

    let mut attempt = 0;
    let details = loop {
        let found = api.fetch_order(order_id).await?.filter(|o| o.order.user_id == claims.sub);
        match found {
            Some(details) => break details,
            None => {
                attempt += 1;
                if attempt >= MAX_ORDER_LOOKUP_ATTEMPTS {
                    info!("💻️ Order {order_id} not found after {attempt} attempts");
                    return Err(ServerError::NoRecordFound("Order not found or unauthorized".to_string()));
                }
                debug!("💻️ Order {order_id} not found, retrying ({attempt}/{MAX_ORDER_LOOKUP_ATTEMPTS})");
                tokio::time::sleep(ORDER_LOOKUP_RETRY_DELAY).await;
            },
        }
    };
    if details.order.total.value() != amount {
        return Err(ServerError::ValidationError("Amount mismatch with order".to_string()));
    }

    let metadata = IntentMetadata { order_id, user_id: claims.sub.clone() };
    let intent = NewPaymentIntent::new(
        details.order.total,
        &pricing.currency,
        format!("Order #{order_id} - {} items", details.items.len()),
        metadata,
    );
    let intent = gateway.create_payment_intent(intent).await.map_err(|e| {
        warn!("💻️ Gateway rejected intent creation for order {order_id}. {e}");
        e
    })?;
    api.attach_payment_ref(order_id, &claims.sub, &intent.id).await?;
    info!("💻️ Payment intent {} created for order {order_id}", intent.id);
    Ok(HttpResponse::Ok().json(IntentResult {
        success: true,
        client_secret: intent.client_secret,
        payment_ref: intent.id,
    }))
}

//----------------------------------------------  Receipts  ----------------------------------------------------------

/// Fetch receipts: one by receipt id, one by order id (existing only), or the caller's recent receipts.
pub async fn receipts<B: ReceiptManagement + StorefrontDatabase>(
    claims: JwtClaims,
    query: web::Query<ReceiptQuery>,
    api: web::Data<ReceiptApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let query = query.into_inner();
    match (query.receipt_id, query.order_id) {
        (Some(receipt_id), _) => {
            debug!("💻️ GET receipt {receipt_id} for {}", claims.sub);
            let receipt = api.receipt(receipt_id, &claims.sub).await?;
            Ok(HttpResponse::Ok().json(receipt))
        },
        (None, Some(order_id)) => {
            debug!("💻️ GET receipt for order {order_id} for {}", claims.sub);
            let receipt = api.existing_receipt_for_order(order_id, &claims.sub).await.map_err(|e| {
                debug!("💻️ No receipt for order {order_id}. {e}");
                ServerError::NoRecordFound("Receipt not found for this order".to_string())
            })?;
            Ok(HttpResponse::Ok().json(receipt))
        },
        (None, None) => {
            debug!("💻️ GET receipts for {}", claims.sub);
            let receipts = api.receipts_for_user(&claims.sub, RECEIPT_LIST_LIMIT).await?;
            Ok(HttpResponse::Ok().json(receipts))
        },
    }
}

/// Fetch-or-create the receipt for an order. Generation happens at most once; repeat calls return the stored
/// snapshot unchanged.
pub async fn create_receipt<B: ReceiptManagement + StorefrontDatabase>(
    claims: JwtClaims,
    path: web::Path<i64>,
    api: web::Data<ReceiptApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = path.into_inner();
    debug!("💻️ Receipt request for order {order_id} from {}", claims.sub);
    let receipt = api.receipt_for_order(order_id, &claims.sub).await?;
    Ok(HttpResponse::Ok().json(receipt))
}

//----------------------------------------------  Webhooks  ----------------------------------------------------------

fn signature_rejection(e: SignatureError) -> HttpResponse {
    match e {
        SignatureError::InvalidPayload(msg) => {
            warn!("🔐️ Webhook body could not be parsed. {msg}");
            HttpResponse::BadRequest().json(JsonResponse::failure("Unparseable event payload."))
        },
        e => {
            warn!("🔐️ Webhook delivery rejected. {e}");
            HttpResponse::Unauthorized().json(JsonResponse::failure("Invalid signature."))
        },
    }
}

/// The asynchronous payment notification path. The gateway signs each delivery; an unverifiable delivery is
/// rejected without touching any order. Once verified, processing errors are logged and acknowledged with 200,
/// since surfacing them would only trigger the gateway's retry storm on permanent failures.
pub async fn payment_webhook<B: StorefrontDatabase>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<OrderFlowApi<B>>,
    config: web::Data<WebhookConfig>,
) -> HttpResponse {
    trace!("💳️ Received gateway webhook ({} bytes)", body.len());
    let header = match req.headers().get(GATEWAY_SIGNATURE_HEADER).and_then(|h| h.to_str().ok()) {
        Some(h) => h,
        None => return signature_rejection(SignatureError::MissingSignature),
    };
    let event = match verify_signed_event::<GatewayEvent>(header, &body, config.gateway_secret.reveal()) {
        Ok(event) => event.into_inner(),
        Err(e) => return signature_rejection(e),
    };
    // -- from here on, we trust that the notification is legitimate.
    let intent = event.data.object;
    let order_id = intent.metadata.order_id;
    let result = match event.event_type {
        GatewayEventType::PaymentSucceeded => match api.payment_succeeded(order_id, &intent.id).await {
            Ok(order) => {
                info!("💳️ Order #{order_id} marked paid via webhook. Status: {}", order.status);
                JsonResponse::success("Payment recorded.")
            },
            Err(e) => {
                warn!("💳️ Could not apply payment success for order #{order_id}. {e}");
                JsonResponse::failure("Could not record payment.")
            },
        },
        GatewayEventType::PaymentFailed => match api.payment_failed(order_id).await {
            Ok(_) => {
                info!("💳️ Payment failure recorded for order #{order_id}");
                JsonResponse::success("Payment failure recorded.")
            },
            Err(e) => {
                warn!("💳️ Could not apply payment failure for order #{order_id}. {e}");
                JsonResponse::failure("Could not record payment failure.")
            },
        },
        GatewayEventType::Other => {
            debug!("💳️ Ignoring unhandled gateway event type");
            JsonResponse::success("Event ignored.")
        },
    };
    HttpResponse::Ok().json(result)
}

/// User-record sync from the identity provider. Same signature scheme as the payment webhook, different secret.
pub async fn identity_webhook<B: AccountManagement>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<AccountApi<B>>,
    config: web::Data<WebhookConfig>,
) -> HttpResponse {
    trace!("👤️ Received identity webhook ({} bytes)", body.len());
    let header = match req.headers().get(IDENTITY_SIGNATURE_HEADER).and_then(|h| h.to_str().ok()) {
        Some(h) => h,
        None => return signature_rejection(SignatureError::MissingSignature),
    };
    let event = match verify_signed_event::<IdentityEvent>(header, &body, config.identity_secret.reveal()) {
        Ok(event) => event.into_inner(),
        Err(e) => return signature_rejection(e),
    };
    let user = event.data;
    let result = match event.event_type {
        IdentityEventType::UserCreated | IdentityEventType::UserUpdated => {
            let record = storefront_engine::db_types::NewUser {
                id: user.id.clone(),
                name: user.name,
                email: user.email,
                avatar_url: user.avatar_url,
            };
            match api.sync_user(record).await {
                Ok(_) => JsonResponse::success("User record synced."),
                Err(e) => {
                    warn!("👤️ Could not sync user {}. {e}", user.id);
                    JsonResponse::failure("Could not sync user record.")
                },
            }
        },
        IdentityEventType::UserDeleted => match api.remove_user(&user.id).await {
            Ok(()) => JsonResponse::success("User record removed."),
            Err(e) => {
                warn!("👤️ Could not remove user {}. {e}", user.id);
                JsonResponse::failure("Could not remove user record.")
            },
        },
        IdentityEventType::Other => {
            debug!("👤️ Ignoring unhandled identity event type");
            JsonResponse::success("Event ignored.")
        },
    };
    HttpResponse::Ok().json(result)
}
