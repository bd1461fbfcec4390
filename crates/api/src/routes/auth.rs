//! Token issuing and account registration endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use domain::DomainError;
use serde::{Deserialize, Serialize};
use storage::{PvzStore, Role, UserId};

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct DummyLoginRequest {
    pub role: String,
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub email: String,
    pub role: Role,
}

fn parse_role(role: &str) -> Result<Role, ApiError> {
    Ok(role.parse::<Role>().map_err(DomainError::from)?)
}

/// POST /dummyLogin: issues a subject-less token for the requested role.
#[tracing::instrument(skip(state, body))]
pub async fn dummy_login<S: PvzStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<DummyLoginRequest>, JsonRejection>,
) -> Result<Json<String>, ApiError> {
    let Json(req) = body?;
    let role = parse_role(&req.role)?;
    let token = state.tokens.issue(None, role)?;
    Ok(Json(token))
}

/// POST /register: creates an account with a single role.
#[tracing::instrument(skip(state, body))]
pub async fn register<S: PvzStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let Json(req) = body?;
    let role = parse_role(&req.role)?;
    let user = state
        .identity
        .create_user(&req.email, &req.password, &[role])
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id: user.id,
            email: user.email,
            role,
        }),
    ))
}

/// POST /login: exchanges credentials for a token bound to the account.
#[tracing::instrument(skip(state, body))]
pub async fn login<S: PvzStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<String>, ApiError> {
    let Json(req) = body?;
    let user = state.identity.authenticate(&req.email, &req.password).await?;
    let role = user.roles.first().copied().ok_or(DomainError::Auth)?;
    let token = state.tokens.issue(Some(user.id), role)?;
    Ok(Json(token))
}
