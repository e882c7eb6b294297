use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::domain::{PrincipalKind, PrincipalRef, Role};
use crate::config::AuthConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: String,
    pub kind: PrincipalKind,
    pub role: Role,
    pub exp: i64,
}

/// Identity the routers hand to the workflow services once a bearer token
/// has been verified. The services trust this triple as authenticated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthPrincipal {
    pub id: String,
    pub kind: PrincipalKind,
    pub role: Role,
}

impl AuthPrincipal {
    pub fn reference(&self) -> PrincipalRef {
        PrincipalRef {
            kind: self.kind,
            id: self.id.clone(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("missing bearer token")]
    Missing,
    #[error("invalid or expired token")]
    Invalid,
    #[error("failed to sign token")]
    Signing,
}

/// HS256 signing and verification material derived from the configured
/// secret. Cheap to clone, so each router holds its own copy.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.token_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.token_secret.as_bytes()),
            ttl: Duration::minutes(config.token_ttl_minutes),
        }
    }

    pub fn issue(&self, principal: &AuthPrincipal) -> Result<String, TokenError> {
        let claims = AccessClaims {
            sub: principal.id.clone(),
            kind: principal.kind,
            role: principal.role,
            exp: (Utc::now() + self.ttl).timestamp(),
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
            .map_err(|_| TokenError::Signing)
    }

    pub fn verify(&self, token: &str) -> Result<AuthPrincipal, TokenError> {
        let data =
            jsonwebtoken::decode::<AccessClaims>(token, &self.decoding, &Validation::default())
                .map_err(|_| TokenError::Invalid)?;
        Ok(AuthPrincipal {
            id: data.claims.sub,
            kind: data.claims.kind,
            role: data.claims.role,
        })
    }

    /// Pulls `Authorization: Bearer <token>` out of the request headers.
    pub fn authenticate(&self, headers: &HeaderMap) -> Result<AuthPrincipal, TokenError> {
        let raw = headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(TokenError::Missing)?;
        let token = raw.strip_prefix("Bearer ").ok_or(TokenError::Missing)?;
        self.verify(token.trim())
    }
}
