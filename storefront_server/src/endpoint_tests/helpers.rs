use actix_web::{
    body::MessageBody,
    http::StatusCode,
    test,
    test::TestRequest,
    web,
    web::ServiceConfig,
    App,
};
use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;
use storefront_common::Secret;

use crate::{
    auth::{issue_access_token, JwtClaims, Role},
    config::AuthConfig,
};

// Test-only verification secret. DO NOT re-use this value anywhere.
pub const TEST_JWT_SECRET: &str = "test-verification-secret-0123456789abcdef";

pub fn get_auth_config() -> AuthConfig {
    AuthConfig { jwt_secret: Secret::new(TEST_JWT_SECRET.to_string()) }
}

pub fn issue_token(sub: &str, role: Role, expiry: DateTime<Utc>) -> String {
    let claims = JwtClaims { sub: sub.to_string(), role, exp: expiry.timestamp() };
    issue_access_token(&claims, TEST_JWT_SECRET)
}

pub fn customer_token() -> String {
    issue_token("user_2xKq", Role::Customer, Utc::now() + chrono::Duration::days(1))
}

pub fn admin_token() -> String {
    issue_token("user_admin", Role::Admin, Utc::now() + chrono::Duration::days(1))
}

/// Drives a request through a test app and always hands back (status, body), rendering handler errors through their
/// `ResponseError` implementation the way the real server would.
async fn send_request(req: TestRequest, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    let req = req.to_request();
    let app = App::new().app_data(web::Data::new(get_auth_config())).configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let res = match test::try_call_service(&service, req).await {
        Ok(res) => res.into_parts().1,
        Err(e) => e.error_response(),
    };
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    (status, body)
}

fn with_auth(mut req: TestRequest, token: &str) -> TestRequest {
    if !token.is_empty() {
        req = req.insert_header(("Authorization", format!("Bearer {token}")));
    }
    req
}

pub async fn get_request(token: &str, path: &str, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    send_request(with_auth(TestRequest::get().uri(path), token), configure).await
}

pub async fn post_request<B: Serialize>(
    token: &str,
    path: &str,
    body: B,
    configure: fn(&mut ServiceConfig),
) -> (StatusCode, String) {
    send_request(with_auth(TestRequest::post().uri(path).set_json(body), token), configure).await
}

pub async fn patch_request<B: Serialize>(
    token: &str,
    path: &str,
    body: B,
    configure: fn(&mut ServiceConfig),
) -> (StatusCode, String) {
    send_request(with_auth(TestRequest::patch().uri(path).set_json(body), token), configure).await
}

pub async fn delete_request(token: &str, path: &str, configure: fn(&mut ServiceConfig)) -> (StatusCode, String) {
    send_request(with_auth(TestRequest::delete().uri(path), token), configure).await
}

/// A raw POST with explicit headers, for the webhook endpoints.
pub async fn post_raw_request(
    path: &str,
    headers: &[(&str, String)],
    body: Vec<u8>,
    configure: fn(&mut ServiceConfig),
) -> (StatusCode, String) {
    let mut req = TestRequest::post().uri(path).set_payload(body);
    for (name, value) in headers {
        req = req.insert_header((*name, value.as_str()));
    }
    send_request(req, configure).await
}
