//! Rows persisted by the store.

use chrono::{DateTime, Utc};

use crate::{City, ProductId, ProductType, PvzId, ReceptionId, ReceptionStatus, Role, UserId};

/// A registered account.
///
/// Only the one-way hash of the secret is ever stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub secret_hash: String,
    pub roles: Vec<Role>,
}

impl User {
    /// Returns true if the account carries the given role.
    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// Input for registering an account.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub secret_hash: String,
    pub roles: Vec<Role>,
}

/// A pickup point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pvz {
    pub id: PvzId,
    pub created_at: DateTime<Utc>,
    pub city: City,
    pub creator_id: Option<UserId>,
}

/// Input for creating a pickup point.
///
/// Id and registration date are generated by the store when absent.
#[derive(Debug, Clone)]
pub struct NewPvz {
    pub id: Option<PvzId>,
    pub created_at: Option<DateTime<Utc>>,
    pub city: City,
    pub creator_id: Option<UserId>,
}

impl NewPvz {
    pub fn new(city: City) -> Self {
        Self {
            id: None,
            created_at: None,
            city,
            creator_id: None,
        }
    }

    pub fn with_id(mut self, id: PvzId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn registered_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    pub fn created_by(mut self, creator: Option<UserId>) -> Self {
        self.creator_id = creator;
        self
    }
}

/// A goods-receiving session at a pickup point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reception {
    pub id: ReceptionId,
    pub pvz_id: PvzId,
    pub created_at: DateTime<Utc>,
    pub status: ReceptionStatus,
    pub creator_id: Option<UserId>,
}

/// An item logged inside a reception.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub reception_id: ReceptionId,
    pub created_at: DateTime<Utc>,
    pub product_type: ProductType,
    pub creator_id: Option<UserId>,
}

/// One row of the product → reception → pickup point join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRow {
    pub pvz_id: PvzId,
    pub pvz_created_at: DateTime<Utc>,
    pub city: City,
    pub reception_id: ReceptionId,
    pub reception_created_at: DateTime<Utc>,
    pub reception_status: ReceptionStatus,
    pub product_id: ProductId,
    pub product_created_at: DateTime<Utc>,
    pub product_type: ProductType,
}

/// Window over the product join.
///
/// Rows are filtered by product creation time (both bounds inclusive),
/// sorted newest first and then sliced with `offset`/`limit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductRowQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub offset: u64,
    pub limit: u64,
}

impl ProductRowQuery {
    /// Builds the window for a 1-based page of `limit` rows.
    pub fn page(from: DateTime<Utc>, to: DateTime<Utc>, page: u64, limit: u64) -> Self {
        Self {
            from,
            to,
            offset: limit.saturating_mul(page.saturating_sub(1)),
            limit,
        }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at <= self.to
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn page_computes_offset() {
        let from = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2025, 12, 31, 0, 0, 0).unwrap();

        let first = ProductRowQuery::page(from, to, 1, 10);
        assert_eq!(first.offset, 0);
        assert_eq!(first.limit, 10);

        let third = ProductRowQuery::page(from, to, 3, 10);
        assert_eq!(third.offset, 20);
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let from = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();
        let query = ProductRowQuery::page(from, to, 1, 1);

        assert!(query.contains(from));
        assert!(query.contains(to));
        assert!(!query.contains(to + chrono::Duration::seconds(1)));
    }

    #[test]
    fn new_pvz_builder() {
        let id = PvzId::new();
        let creator = UserId::new();
        let pvz = NewPvz::new(City::Kazan)
            .with_id(id)
            .created_by(Some(creator));
        assert_eq!(pvz.id, Some(id));
        assert_eq!(pvz.creator_id, Some(creator));
        assert!(pvz.created_at.is_none());
    }
}
