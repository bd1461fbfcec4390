//! Pickup point endpoints.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use domain::{CreatePvz, ListParams, Operation, PvzView, ReceptionView};
use serde::{Deserialize, Deserializer, Serialize, de};
use storage::{City, Pvz, PvzId, PvzStore};

use crate::AppState;
use crate::auth::Caller;
use crate::error::ApiError;
use crate::routes::products::ProductResponse;
use crate::routes::receptions::ReceptionResponse;

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePvzRequest {
    pub id: Option<String>,
    pub registration_date: Option<DateTime<Utc>>,
    pub city: String,
}

/// Query string of `GET /pvz`. A parameter given with an empty value
/// (`?page=`) falls back to its default like an absent one.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPvzQuery {
    #[serde(default, deserialize_with = "empty_as_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub limit: Option<i64>,
}

fn empty_as_none<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: fmt::Display,
{
    match Option::<String>::deserialize(deserializer)?.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(de::Error::custom),
    }
}

impl From<ListPvzQuery> for ListParams {
    fn from(query: ListPvzQuery) -> Self {
        let defaults = ListParams::default();
        Self {
            start_date: query.start_date,
            end_date: query.end_date,
            page: query.page.unwrap_or(defaults.page),
            limit: query.limit.unwrap_or(defaults.limit),
        }
    }
}

// -- Response types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PvzResponse {
    pub id: PvzId,
    pub registration_date: DateTime<Utc>,
    pub city: City,
}

impl From<Pvz> for PvzResponse {
    fn from(pvz: Pvz) -> Self {
        Self {
            id: pvz.id,
            registration_date: pvz.created_at,
            city: pvz.city,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReceptionWithProducts {
    #[serde(flatten)]
    pub reception: ReceptionResponse,
    pub products: Vec<ProductResponse>,
}

impl From<&ReceptionView> for ReceptionWithProducts {
    fn from(view: &ReceptionView) -> Self {
        Self {
            reception: view.into(),
            products: view.products.iter().map(ProductResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PvzWithReceptions {
    #[serde(flatten)]
    pub pvz: PvzResponse,
    pub receptions: Vec<ReceptionWithProducts>,
}

impl From<PvzView> for PvzWithReceptions {
    fn from(view: PvzView) -> Self {
        Self {
            pvz: PvzResponse {
                id: view.id,
                registration_date: view.registration_date,
                city: view.city,
            },
            receptions: view.receptions.iter().map(ReceptionWithProducts::from).collect(),
        }
    }
}

// -- Handlers --

/// POST /pvz: registers a pickup point.
#[tracing::instrument(skip(state, body))]
pub async fn create<S: PvzStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    body: Result<Json<CreatePvzRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PvzResponse>), ApiError> {
    caller.require(Operation::CreatePvz)?;
    let Json(req) = body?;
    let pvz = state
        .engine
        .create_pickup_point(
            caller.subject,
            CreatePvz {
                id: req.id,
                registration_date: req.registration_date,
                city: req.city,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(pvz.into())))
}

/// GET /pvz: lists pickup points with receptions and products in the window.
#[tracing::instrument(skip(state))]
pub async fn list<S: PvzStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    query: Result<Query<ListPvzQuery>, QueryRejection>,
) -> Result<Json<Vec<PvzWithReceptions>>, ApiError> {
    caller.require(Operation::ListPvz)?;
    let Query(query) = query?;
    let listed = state.query.list_pickup_points(query.into()).await?;
    Ok(Json(listed.into_iter().map(PvzWithReceptions::from).collect()))
}

/// POST /pvz/{pvz_id}/close_last_reception
#[tracing::instrument(skip(state))]
pub async fn close_last_reception<S: PvzStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(pvz_id): Path<String>,
) -> Result<Json<ReceptionResponse>, ApiError> {
    caller.require(Operation::CloseReception)?;
    let reception = state.engine.close_reception(&pvz_id).await?;
    Ok(Json(reception.into()))
}

/// POST /pvz/{pvz_id}/delete_last_product
#[tracing::instrument(skip(state))]
pub async fn delete_last_product<S: PvzStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    Path(pvz_id): Path<String>,
) -> Result<Json<ProductResponse>, ApiError> {
    caller.require(Operation::DeleteProduct)?;
    let product = state.engine.delete_last_product(&pvz_id).await?;
    Ok(Json(product.into()))
}
