//! Access tokens and the authenticated caller extractor.
//!
//! Tokens are HS256 JWTs carrying the caller's role and, for registered
//! accounts, their user id. Tokens minted by `/dummyLogin` carry an empty id.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use chrono::{DateTime, Duration, Utc};
use domain::{Decision, Operation, authorize};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use storage::{PvzStore, Role, UserId};
use thiserror::Error;

use crate::AppState;
use crate::error::ApiError;

/// How long an issued token stays valid.
pub const TOKEN_LIFETIME: Duration = Duration::hours(12);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("invalid token")]
    Invalid,

    #[error("token could not be signed: {0}")]
    Signing(String),
}

/// Identity proven by a verified token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub subject: Option<UserId>,
    pub role: Role,
}

impl Caller {
    /// Fails with `Forbidden` unless the policy allows the operation.
    pub fn require(&self, operation: Operation) -> Result<(), ApiError> {
        match authorize(self.role, operation) {
            Decision::Allow => Ok(()),
            Decision::Deny => {
                tracing::debug!(role = %self.role, %operation, "access denied");
                Err(ApiError::Forbidden(format!(
                    "role {} may not {operation}",
                    self.role
                )))
            }
        }
    }
}

/// Issues and verifies access tokens.
pub trait TokenAuthority: Send + Sync {
    fn issue(&self, subject: Option<UserId>, role: Role) -> Result<String, TokenError>;

    fn verify(&self, token: &str) -> Result<Caller, TokenError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    id: String,
    role: Role,
    iat: i64,
    exp: i64,
}

/// HMAC-SHA256 JWT authority.
pub struct JwtAuth {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl JwtAuth {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat"]);
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    fn issue_at(
        &self,
        subject: Option<UserId>,
        role: Role,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            id: subject.map(|id| id.to_string()).unwrap_or_default(),
            role,
            iat: issued_at.timestamp(),
            exp: (issued_at + TOKEN_LIFETIME).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }
}

impl TokenAuthority for JwtAuth {
    fn issue(&self, subject: Option<UserId>, role: Role) -> Result<String, TokenError> {
        self.issue_at(subject, role, Utc::now())
    }

    fn verify(&self, token: &str) -> Result<Caller, TokenError> {
        let data = decode::<Claims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;

        let subject = match data.claims.id.as_str() {
            "" => None,
            id => Some(UserId::parse(id).map_err(|_| TokenError::Invalid)?),
        };
        Ok(Caller {
            subject,
            role: data.claims.role,
        })
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("missing authorization header".to_string()))?;
    header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("malformed authorization header".to_string()))
}

impl<S> FromRequestParts<Arc<AppState<S>>> for Caller
where
    S: PvzStore + Clone + 'static,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState<S>>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        Ok(state.tokens.verify(token)?)
    }
}
