//! Caller identity.
//!
//! Authentication is delegated to the external identity provider, which signs an HS256 JWT (shared secret) for every
//! signed-in user. This module verifies that token and hands the claims to handlers as an extractor; once the
//! signature and expiry check out, the claims are trusted verbatim. The server never mints tokens in production;
//! [`issue_access_token`] exists for tests and local development.

use std::future::{ready, Ready};

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use chrono::Utc;
use hmac::{Hmac, Mac};
use log::debug;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

impl Default for Role {
    fn default() -> Self {
        Self::Customer
    }
}

/// The verified claims of an identity-provider token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// The provider's opaque user id.
    pub sub: String,
    #[serde(default)]
    pub role: Role,
    /// Expiry as a unix timestamp.
    pub exp: i64,
}

impl JwtClaims {
    pub fn user_id(&self) -> &str {
        &self.sub
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), ServerError> {
        if self.is_admin() {
            Ok(())
        } else {
            debug!("🔐️ {} is not an admin account", self.sub);
            Err(ServerError::InsufficientPermissions("Admin privileges required".to_string()))
        }
    }
}

/// Verify an HS256 JWT against the shared secret and return its claims.
pub fn verify_access_token(token: &str, secret: &str) -> Result<JwtClaims, AuthError> {
    let mut parts = token.split('.');
    let (header_b64, claims_b64, sig_b64) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some(h), Some(c), Some(s), None) => (h, c, s),
        _ => return Err(AuthError::PoorlyFormattedToken("expected three dot-separated segments".to_string())),
    };
    let header = base64::decode_config(header_b64, base64::URL_SAFE_NO_PAD)
        .map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
    let header: JwtHeader =
        serde_json::from_slice(&header).map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
    if header.alg != "HS256" {
        return Err(AuthError::PoorlyFormattedToken(format!("unsupported algorithm {}", header.alg)));
    }
    let signature = base64::decode_config(sig_b64, base64::URL_SAFE_NO_PAD)
        .map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| AuthError::ValidationError(e.to_string()))?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(claims_b64.as_bytes());
    mac.verify_slice(&signature).map_err(|_| AuthError::ValidationError("signature mismatch".to_string()))?;
    let claims = base64::decode_config(claims_b64, base64::URL_SAFE_NO_PAD)
        .map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
    let claims: JwtClaims =
        serde_json::from_slice(&claims).map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
    if claims.exp <= Utc::now().timestamp() {
        return Err(AuthError::TokenExpired);
    }
    Ok(claims)
}

/// Sign a token the way the identity provider would. Test/dev use only.
pub fn issue_access_token(claims: &JwtClaims, secret: &str) -> String {
    let header = base64::encode_config(br#"{"alg":"HS256","typ":"JWT"}"#, base64::URL_SAFE_NO_PAD);
    let body = serde_json::to_vec(claims).expect("JwtClaims always serializes");
    let body = base64::encode_config(body, base64::URL_SAFE_NO_PAD);
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(header.as_bytes());
    mac.update(b".");
    mac.update(body.as_bytes());
    let signature = base64::encode_config(mac.finalize().into_bytes(), base64::URL_SAFE_NO_PAD);
    format!("{header}.{body}.{signature}")
}

#[derive(Debug, Deserialize)]
struct JwtHeader {
    alg: String,
}

fn claims_from_request(req: &HttpRequest) -> Result<JwtClaims, ServerError> {
    let config = req
        .app_data::<web::Data<AuthConfig>>()
        .ok_or_else(|| ServerError::InitializeError("AuthConfig is not registered with the app".to_string()))?;
    let header = req.headers().get("Authorization").ok_or(AuthError::MissingToken)?;
    let token = header
        .to_str()
        .ok()
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| AuthError::PoorlyFormattedToken("expected a Bearer token".to_string()))?;
    let claims = verify_access_token(token, config.jwt_secret.reveal())?;
    Ok(claims)
}

impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(claims_from_request(req))
    }
}

#[cfg(test)]
mod test {
    use chrono::{Duration, Utc};

    use super::{issue_access_token, verify_access_token, JwtClaims, Role};

    fn claims(role: Role) -> JwtClaims {
        JwtClaims { sub: "user_2xKq".to_string(), role, exp: (Utc::now() + Duration::hours(1)).timestamp() }
    }

    #[test]
    fn roundtrip() {
        let token = issue_access_token(&claims(Role::Customer), "super-secret-key");
        let verified = verify_access_token(&token, "super-secret-key").expect("token should verify");
        assert_eq!(verified.sub, "user_2xKq");
        assert_eq!(verified.role, Role::Customer);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = issue_access_token(&claims(Role::Admin), "super-secret-key");
        let err = verify_access_token(&token, "a-different-secret").unwrap_err();
        assert!(err.to_string().contains("signature"), "unexpected error: {err}");
    }

    #[test]
    fn tampered_role_is_rejected() {
        let token = issue_access_token(&claims(Role::Customer), "super-secret-key");
        let mut parts: Vec<String> = token.split('.').map(String::from).collect();
        let body = base64::encode_config(
            serde_json::to_vec(&claims(Role::Admin)).unwrap(),
            base64::URL_SAFE_NO_PAD,
        );
        parts[1] = body;
        let tampered = parts.join(".");
        assert!(verify_access_token(&tampered, "super-secret-key").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let expired =
            JwtClaims { sub: "user_2xKq".to_string(), role: Role::Customer, exp: (Utc::now() - Duration::hours(1)).timestamp() };
        let token = issue_access_token(&expired, "super-secret-key");
        let err = verify_access_token(&token, "super-secret-key").unwrap_err();
        assert!(err.to_string().contains("expired"), "unexpected error: {err}");
    }
}
