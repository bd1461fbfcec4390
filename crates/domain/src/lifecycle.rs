//! Pickup point, reception and product lifecycle.
//!
//! Reception state machine:
//! ```text
//! (open_reception) ──► InProgress ──close_reception──► Closed
//!                         │  ▲
//!          add_product ───┘  └─── delete_last_product (LIFO)
//! ```
//!
//! The engine is role-agnostic. Callers pass the acting user only so it can be
//! recorded as `creator_id`; authorization happens in the transport layer
//! through [`crate::policy`].

use chrono::{DateTime, Utc};
use storage::{City, NewPvz, Product, ProductType, Pvz, PvzId, PvzStore, Reception, UserId};

use crate::error::DomainError;

/// Input for registering a pickup point.
#[derive(Debug, Clone, Default)]
pub struct CreatePvz {
    pub id: Option<String>,
    pub registration_date: Option<DateTime<Utc>>,
    pub city: String,
}

/// Service enforcing the reception lifecycle against a store.
pub struct LifecycleEngine<S: PvzStore> {
    store: S,
}

impl<S: PvzStore> LifecycleEngine<S> {
    /// Creates a new engine over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Registers a pickup point.
    #[tracing::instrument(skip(self))]
    pub async fn create_pickup_point(
        &self,
        creator: Option<UserId>,
        input: CreatePvz,
    ) -> Result<Pvz, DomainError> {
        let city: City = input.city.parse()?;
        let mut new_pvz = NewPvz::new(city).created_by(creator);
        if let Some(id) = input.id.as_deref().filter(|id| !id.is_empty()) {
            new_pvz = new_pvz.with_id(PvzId::parse(id)?);
        }
        if let Some(at) = input.registration_date {
            new_pvz = new_pvz.registered_at(at);
        }

        let pvz = self.store.create_pvz(new_pvz).await?;
        metrics::counter!("pvz_created_total").increment(1);
        tracing::info!(pvz_id = %pvz.id, city = %pvz.city, "pickup point created");
        Ok(pvz)
    }

    /// Opens a reception. Fails if one is already in progress.
    #[tracing::instrument(skip(self))]
    pub async fn open_reception(
        &self,
        creator: Option<UserId>,
        pvz_id: &str,
    ) -> Result<Reception, DomainError> {
        let pvz_id = PvzId::parse(pvz_id)?;
        let reception = self.store.open_reception(pvz_id, creator).await?;
        metrics::counter!("receptions_created_total").increment(1);
        tracing::info!(%pvz_id, reception_id = %reception.id, "reception opened");
        Ok(reception)
    }

    /// Closes the most recent reception. Closed receptions cannot be reopened.
    #[tracing::instrument(skip(self))]
    pub async fn close_reception(&self, pvz_id: &str) -> Result<Reception, DomainError> {
        let pvz_id = PvzId::parse(pvz_id)?;
        let reception = self.store.close_last_reception(pvz_id).await?;
        tracing::info!(%pvz_id, reception_id = %reception.id, "reception closed");
        Ok(reception)
    }

    /// Appends a product to the open reception.
    #[tracing::instrument(skip(self))]
    pub async fn add_product(
        &self,
        creator: Option<UserId>,
        pvz_id: &str,
        product_type: &str,
    ) -> Result<Product, DomainError> {
        let product_type: ProductType = product_type.parse()?;
        let pvz_id = PvzId::parse(pvz_id)?;
        let product = self
            .store
            .add_product(pvz_id, product_type, creator)
            .await?;
        metrics::counter!("products_added_total").increment(1);
        tracing::debug!(%pvz_id, product_id = %product.id, %product_type, "product added");
        Ok(product)
    }

    /// Removes the most recently added product of the open reception.
    #[tracing::instrument(skip(self))]
    pub async fn delete_last_product(&self, pvz_id: &str) -> Result<Product, DomainError> {
        let pvz_id = PvzId::parse(pvz_id)?;
        let product = self.store.delete_last_product(pvz_id).await?;
        tracing::debug!(%pvz_id, product_id = %product.id, "product removed");
        Ok(product)
    }
}
