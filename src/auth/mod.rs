//! Bearer-token authentication and role gates.
//!
//! `AuthUser` accepts any request carrying a valid `Authorization: Bearer` token.
//! `AdminUser` additionally requires the token's user to hold [`Role::Admin`].

use std::time::Duration;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;
use crate::models::{Extra, Role, User};
use crate::AppState;

/// Lifetime of an issued token.
pub const TOKEN_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Decoded token payload. Clients put whatever they like in it; `email` is the
/// only claim the server interprets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: i64,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Response body for `POST /jwt`.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Issues and verifies HS256 bearer tokens.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8]) -> Self {
        Self::with_ttl(secret, TOKEN_TTL)
    }

    pub fn with_ttl(secret: &[u8], ttl: Duration) -> Self {
        // Only signature and expiry are checked; audience is just another claim.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    /// Sign an arbitrary claims object. `iat` and `exp` are always server-set.
    pub fn issue(&self, mut claims: Extra) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        claims.insert("iat".to_string(), Value::from(now));
        claims.insert(
            "exp".to_string(),
            Value::from(now + self.ttl.as_secs() as i64),
        );

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            tracing::error!("Failed to sign token: {}", e);
            AppError::Internal("Failed to sign token".to_string())
        })
    }

    /// Check signature and expiry, returning the decoded claims.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation)?;
        Ok(data.claims)
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header value.
fn bearer_token(value: &str) -> Option<&str> {
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// A request that passed the authentication gate.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn email(&self) -> Option<&str> {
        self.0.email.as_deref()
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| AppError::Unauthorized("unauthorized access".to_string()))?;

        let claims = state.tokens.verify(token)?;
        Ok(AuthUser(claims))
    }
}

/// A request whose token belongs to an admin.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;

        let user = match auth.email() {
            Some(email) => state.repo.find_user_by_email(email).await?,
            None => None,
        };

        match user {
            Some(user) if user.has_role(Role::Admin) => Ok(AdminUser(user)),
            _ => {
                tracing::warn!("Admin access denied for {:?}", auth.email());
                Err(forbidden())
            }
        }
    }
}

pub fn forbidden() -> AppError {
    AppError::Forbidden("forbidden access".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claims(value: Value) -> Extra {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_issue_and_verify() {
        let tokens = TokenService::new(b"test-secret");
        let token = tokens
            .issue(claims(json!({ "email": "a@b.com", "name": "Ann" })))
            .unwrap();

        let decoded = tokens.verify(&token).unwrap();
        assert_eq!(decoded.email.as_deref(), Some("a@b.com"));
        assert_eq!(decoded.extra.get("name"), Some(&json!("Ann")));
        assert_eq!(decoded.exp - decoded.iat, TOKEN_TTL.as_secs() as i64);
    }

    #[test]
    fn test_client_cannot_choose_expiry() {
        let tokens = TokenService::new(b"test-secret");
        let token = tokens
            .issue(claims(json!({ "email": "a@b.com", "exp": 9_999_999_999_i64 })))
            .unwrap();

        let decoded = tokens.verify(&token).unwrap();
        assert!(decoded.exp < 9_999_999_999);
    }

    #[test]
    fn test_audience_claim_is_accepted() {
        let tokens = TokenService::new(b"test-secret");
        let token = tokens
            .issue(claims(json!({ "email": "a@b.com", "aud": "tagtalk" })))
            .unwrap();

        let decoded = tokens.verify(&token).unwrap();
        assert_eq!(decoded.email.as_deref(), Some("a@b.com"));
        assert_eq!(decoded.extra.get("aud"), Some(&json!("tagtalk")));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = TokenService::new(b"one")
            .issue(claims(json!({ "email": "a@b.com" })))
            .unwrap();

        let err = TokenService::new(b"two").verify(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let secret = b"test-secret";
        let expired = claims(json!({
            "email": "a@b.com",
            "iat": Utc::now().timestamp() - 4 * 60 * 60,
            "exp": Utc::now().timestamp() - 2 * 60 * 60
        }));
        let token = encode(
            &Header::new(Algorithm::HS256),
            &expired,
            &EncodingKey::from_secret(secret),
        )
        .unwrap();

        let err = TokenService::new(secret).verify(&token).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_garbage_token_rejected() {
        let err = TokenService::new(b"s").verify("not-a-token").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("abc"), None);
    }
}
