//! Access token issuance and validation.
//!
//! The marketplace does not register or log users in; an upstream identity service does that and
//! issues the bearer tokens this server consumes. Tokens are JWTs signed with HS256 under the
//! shared `FGP_JWT_SECRET`. [`TokenIssuer`] produces them (operator tooling and tests),
//! [`JwtVerifier`] checks them, and [`JwtClaims`] doubles as the request extractor handlers use
//! to learn who is calling.

use actix_web::{dev::Payload, http::header::AUTHORIZATION, web, FromRequest, HttpMessage, HttpRequest};
use chrono::{Duration, Utc};
use farmgate_engine::db_types::Role;
use futures::future::{ready, Ready};
use jsonwebtoken::{
    decode,
    encode,
    errors::ErrorKind,
    Algorithm,
    DecodingKey,
    EncodingKey,
    Header,
    Validation,
};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::{
    config::AuthConfig,
    errors::{AuthError, ServerError},
};

pub const DEFAULT_TOKEN_VALIDITY: Duration = Duration::hours(24);

/// The claims carried in every access token. `sub` is the marketplace user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: i64,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

//-------------------------------------------  TokenIssuer  -----------------------------------------------------------

#[derive(Clone)]
pub struct TokenIssuer {
    key: EncodingKey,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        Self { key: EncodingKey::from_secret(config.jwt_secret.reveal().as_bytes()) }
    }

    /// Sign an access token for the user. `validity` defaults to [`DEFAULT_TOKEN_VALIDITY`].
    pub fn issue_token(&self, user_id: i64, role: Role, validity: Option<Duration>) -> Result<String, ServerError> {
        let now = Utc::now();
        let expires = now + validity.unwrap_or(DEFAULT_TOKEN_VALIDITY);
        let claims = JwtClaims { sub: user_id, role, exp: expires.timestamp(), iat: now.timestamp() };
        encode(&Header::new(Algorithm::HS256), &claims, &self.key)
            .map_err(|e| ServerError::Unspecified(format!("Could not serialize access token. {e}")))
    }
}

//-------------------------------------------  JwtVerifier  -----------------------------------------------------------

#[derive(Clone)]
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            key: DecodingKey::from_secret(config.jwt_secret.reveal().as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn validate(&self, token: &str) -> Result<JwtClaims, AuthError> {
        decode::<JwtClaims>(token, &self.key, &self.validation).map(|data| data.claims).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::ValidationError(e.to_string()),
            }
        })
    }
}

/// Pull the bearer token out of the `Authorization` header.
pub fn bearer_token(req: &HttpRequest) -> Result<&str, AuthError> {
    let header = req.headers().get(AUTHORIZATION).ok_or(AuthError::MissingToken)?;
    let value = header.to_str().map_err(|e| AuthError::ValidationError(e.to_string()))?;
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .ok_or_else(|| AuthError::ValidationError("The Authorization header is not a Bearer token".to_string()))
}

impl FromRequest for JwtClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        // ACL-wrapped routes have already validated the token and stashed the claims.
        if let Some(claims) = req.extensions().get::<JwtClaims>() {
            return ready(Ok(claims.clone()));
        }
        let result = match req.app_data::<web::Data<JwtVerifier>>() {
            Some(verifier) => bearer_token(req)
                .and_then(|token| verifier.validate(token))
                .map_err(|e| {
                    warn!("🔑️ Rejecting request to {}: {e}", req.path());
                    ServerError::AuthenticationError(e)
                }),
            None => Err(ServerError::InitializeError("No JWT verifier is registered on the server".to_string())),
        };
        ready(result)
    }
}
