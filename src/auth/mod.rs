/*!
 * # Authentication
 *
 * Bearer-token verification for the inventory API. Tokens are HS256 JWTs
 * issued by an external identity provider; this module only verifies them
 * and exposes the caller as an [`AuthUser`] request extension.
 */

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::config::AppConfig;
use crate::services::Actor;

/// Claim structure for JWT tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,          // Subject (user ID)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>, // Display name, used as the actor identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,  // JWT ID
    pub iat: i64,             // Issued at time
    pub exp: i64,             // Expiration time
    pub iss: String,          // Issuer
    pub aud: String,          // Audience
}

/// Authenticated caller extracted from the bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    pub name: Option<String>,
    pub token_id: Option<String>,
}

impl AuthUser {
    /// Identity recorded on ledger rows: the `name` claim, else the subject.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(&self.user_id)
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            name: claims.name,
            token_id: claims.jti,
        }
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub enabled: bool,
    pub jwt_secret: String,
    pub jwt_audience: String,
    pub jwt_issuer: String,
}

impl AuthConfig {
    pub fn new(enabled: bool, jwt_secret: String, jwt_audience: String, jwt_issuer: String) -> Self {
        Self {
            enabled,
            jwt_secret,
            jwt_audience,
            jwt_issuer,
        }
    }
}

impl From<&AppConfig> for AuthConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self::new(
            cfg.auth_enabled,
            cfg.jwt_secret.clone(),
            cfg.auth_audience.clone(),
            cfg.auth_issuer.clone(),
        )
    }
}

/// Verifies bearer tokens against the configured secret, issuer and audience
#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for AuthService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthService")
            .field("enabled", &self.config.enabled)
            .field("issuer", &self.config.jwt_issuer)
            .field("audience", &self.config.jwt_audience)
            .finish()
    }
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[config.jwt_audience.as_str()]);
        validation.set_issuer(&[config.jwt_issuer.as_str()]);

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            config,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Validate a JWT token and extract the claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Token rejected: {}", e);
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => AuthError::InvalidToken,
                }
            })
    }

    /// Extract authentication info from request headers
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<AuthUser, AuthError> {
        let value = headers
            .get(header::AUTHORIZATION)
            .ok_or(AuthError::MissingToken)?
            .to_str()
            .map_err(|_| AuthError::InvalidToken)?;

        let token = value
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;

        self.validate_token(token).map(AuthUser::from)
    }
}

/// Authentication error types
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    TokenExpired,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (error_code, error_message) = match &self {
            Self::MissingToken => ("AUTH_MISSING_TOKEN", "No authentication token provided"),
            Self::InvalidToken => ("AUTH_INVALID_TOKEN", "Invalid authentication token"),
            Self::TokenExpired => ("AUTH_TOKEN_EXPIRED", "Token has expired"),
        };

        let body = Json(serde_json::json!({
            "error": {
                "code": error_code,
                "message": error_message,
            }
        }));

        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

/// Authentication middleware that validates bearer tokens
pub async fn auth_middleware(
    State(auth_service): State<Arc<AuthService>>,
    mut request: Request,
    next: Next,
) -> Response {
    if !auth_service.is_enabled() {
        return next.run(request).await;
    }

    match auth_service.authenticate(request.headers()) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Stock operations are attributed to the authenticated user, or to
/// `System` when authentication is disabled.
#[async_trait]
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<AuthUser>()
            .map(|user| Actor::new(user.display_name()))
            .unwrap_or_else(Actor::system))
    }
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self, auth_service: Arc<AuthService>) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self, auth_service: Arc<AuthService>) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            auth_service,
            auth_middleware,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "unit_test_signing_secret_with_enough_length";

    fn service() -> AuthService {
        AuthService::new(AuthConfig::new(
            true,
            SECRET.into(),
            "inventory-api".into(),
            "inventory-auth".into(),
        ))
    }

    fn token(name: Option<&str>, iss: &str, exp_offset: i64) -> String {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: "user-1".into(),
            name: name.map(str::to_string),
            jti: Some("t-1".into()),
            iat: now,
            exp: now + exp_offset,
            iss: iss.into(),
            aud: "inventory-api".into(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            format!("Bearer {}", token).parse().unwrap(),
        );
        headers
    }

    #[test]
    fn valid_token_yields_user_named_by_claim() {
        let user = service()
            .authenticate(&bearer(&token(Some("alice"), "inventory-auth", 600)))
            .unwrap();
        assert_eq!(user.user_id, "user-1");
        assert_eq!(user.display_name(), "alice");
    }

    #[test]
    fn display_name_falls_back_to_subject() {
        let user = service()
            .authenticate(&bearer(&token(None, "inventory-auth", 600)))
            .unwrap();
        assert_eq!(user.display_name(), "user-1");
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let err = service()
            .authenticate(&bearer(&token(None, "someone-else", 600)))
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken));
    }

    #[test]
    fn expired_token_is_rejected() {
        let err = service()
            .authenticate(&bearer(&token(None, "inventory-auth", -3600)))
            .unwrap_err();
        assert!(matches!(err, AuthError::TokenExpired));
    }

    #[test]
    fn missing_header_is_rejected() {
        let err = service().authenticate(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));
    }
}
