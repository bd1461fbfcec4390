//! Product endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use domain::{Operation, ProductView};
use serde::{Deserialize, Serialize};
use storage::{Product, ProductId, ProductType, PvzStore, ReceptionId};

use crate::AppState;
use crate::auth::Caller;
use crate::error::ApiError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddProductRequest {
    #[serde(rename = "type")]
    pub product_type: String,
    pub pvz_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: ProductId,
    pub date_time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub reception_id: ReceptionId,
}

impl From<Product> for ProductResponse {
    fn from(product: Product) -> Self {
        Self {
            id: product.id,
            date_time: product.created_at,
            product_type: product.product_type,
            reception_id: product.reception_id,
        }
    }
}

impl From<&ProductView> for ProductResponse {
    fn from(view: &ProductView) -> Self {
        Self {
            id: view.id,
            date_time: view.date_time,
            product_type: view.product_type,
            reception_id: view.reception_id,
        }
    }
}

/// POST /products: appends a product to the open reception.
#[tracing::instrument(skip(state, body))]
pub async fn add<S: PvzStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    caller: Caller,
    body: Result<Json<AddProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductResponse>), ApiError> {
    caller.require(Operation::AddProduct)?;
    let Json(req) = body?;
    let product = state
        .engine
        .add_product(caller.subject, &req.pvz_id, &req.product_type)
        .await?;
    Ok((StatusCode::CREATED, Json(product.into())))
}
