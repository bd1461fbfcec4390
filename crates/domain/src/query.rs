//! Paginated listing of pickup points with their receptions and products.
//!
//! Pagination counts product rows, not pickup points: the store returns one
//! window of the flat product join and [`group_rows`] folds it back into a
//! tree. A pickup point or reception therefore only appears when at least one
//! of its products falls inside the window.

use chrono::{DateTime, TimeZone, Utc};
use storage::{
    City, ProductId, ProductRow, ProductRowQuery, ProductType, Pvz, PvzId, PvzStore, ReceptionId,
    ReceptionStatus,
};

use crate::error::DomainError;

/// Page size used when the caller does not ask for one.
pub const DEFAULT_LIMIT: i64 = 10;

/// Filter and page for [`PvzQuery::list_pickup_points`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListParams {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub page: i64,
    pub limit: i64,
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl ListParams {
    /// Validates the page and resolves open date bounds.
    fn to_row_query(self) -> Result<ProductRowQuery, DomainError> {
        if self.page <= 0 {
            return Err(DomainError::Validation(format!(
                "page must be a positive integer, got {}",
                self.page
            )));
        }
        if self.limit <= 0 {
            return Err(DomainError::Validation(format!(
                "limit must be a positive integer, got {}",
                self.limit
            )));
        }

        let from = self.start_date.unwrap_or_else(earliest);
        let to = self.end_date.unwrap_or_else(latest);
        Ok(ProductRowQuery::page(
            from,
            to,
            self.page.unsigned_abs(),
            self.limit.unsigned_abs(),
        ))
    }
}

// Bounds stay inside the range PostgreSQL can store.
fn earliest() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

fn latest() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(9999, 12, 31, 23, 59, 59)
        .single()
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// A pickup point with the receptions that have products in the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PvzView {
    pub id: PvzId,
    pub registration_date: DateTime<Utc>,
    pub city: City,
    pub receptions: Vec<ReceptionView>,
}

/// A reception with the products that fall in the window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceptionView {
    pub id: ReceptionId,
    pub pvz_id: PvzId,
    pub date_time: DateTime<Utc>,
    pub status: ReceptionStatus,
    pub products: Vec<ProductView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductView {
    pub id: ProductId,
    pub reception_id: ReceptionId,
    pub date_time: DateTime<Utc>,
    pub product_type: ProductType,
}

/// Folds an ordered product join into a pickup point tree in one pass.
///
/// A new pickup point group starts whenever the pickup point id changes from
/// the previous row, and a new reception group whenever the reception id
/// changes. Input order is preserved at every level.
pub fn group_rows(rows: impl IntoIterator<Item = ProductRow>) -> Vec<PvzView> {
    let mut grouped: Vec<PvzView> = Vec::new();

    for row in rows {
        let product = ProductView {
            id: row.product_id,
            reception_id: row.reception_id,
            date_time: row.product_created_at,
            product_type: row.product_type,
        };

        if grouped.last().is_none_or(|pvz| pvz.id != row.pvz_id) {
            grouped.push(PvzView {
                id: row.pvz_id,
                registration_date: row.pvz_created_at,
                city: row.city,
                receptions: Vec::new(),
            });
        }
        let Some(pvz) = grouped.last_mut() else {
            continue;
        };

        if pvz
            .receptions
            .last()
            .is_none_or(|reception| reception.id != row.reception_id)
        {
            pvz.receptions.push(ReceptionView {
                id: row.reception_id,
                pvz_id: row.pvz_id,
                date_time: row.reception_created_at,
                status: row.reception_status,
                products: Vec::new(),
            });
        }
        if let Some(reception) = pvz.receptions.last_mut() {
            reception.products.push(product);
        }
    }

    grouped
}

/// Read-side service over the store.
pub struct PvzQuery<S: PvzStore> {
    store: S,
}

impl<S: PvzStore> PvzQuery<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Lists pickup points whose products were created inside the window.
    ///
    /// Ordered newest first by pickup point, reception and product.
    #[tracing::instrument(skip(self))]
    pub async fn list_pickup_points(&self, params: ListParams) -> Result<Vec<PvzView>, DomainError> {
        let query = params.to_row_query()?;
        let rows = self.store.product_rows(query).await?;
        tracing::debug!(rows = rows.len(), "product rows fetched");
        Ok(group_rows(rows))
    }

    /// Lists every pickup point without receptions.
    #[tracing::instrument(skip(self))]
    pub async fn list_all_pickup_points(&self) -> Result<Vec<Pvz>, DomainError> {
        Ok(self.store.list_pvz().await?)
    }
}
