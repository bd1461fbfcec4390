use async_trait::async_trait;

use crate::{
    NewPvz, NewUser, Product, ProductRow, ProductRowQuery, ProductType, Pvz, PvzId, Reception,
    Result, User, UserId,
};

/// Core trait for store implementations.
///
/// The lifecycle methods (`open_reception`, `close_last_reception`,
/// `add_product`, `delete_last_product`) are each a single atomic unit that is
/// serialized against every other lifecycle call on the same pickup point.
/// Implementations must never partially apply one of them.
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait PvzStore: Send + Sync {
    /// Brings the backing schema up to date. Stores without a schema do nothing.
    async fn run_migrations(&self) -> Result<()> {
        Ok(())
    }

    /// Registers an account.
    ///
    /// Fails with `EmailTaken` if the email is already registered.
    async fn create_user(&self, user: NewUser) -> Result<User>;

    /// Looks up an account by email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Creates a pickup point.
    ///
    /// Fails with `PvzAlreadyExists` if an explicit id is already taken.
    async fn create_pvz(&self, pvz: NewPvz) -> Result<Pvz>;

    /// Lists every pickup point, oldest first.
    async fn list_pvz(&self) -> Result<Vec<Pvz>>;

    /// Opens a reception at a pickup point.
    ///
    /// Fails with `PvzNotFound` or `ReceptionAlreadyOpen`.
    async fn open_reception(&self, pvz_id: PvzId, creator: Option<UserId>) -> Result<Reception>;

    /// Closes the most recent reception of a pickup point.
    ///
    /// Fails with `PvzNotFound`, `NoReception` or `ReceptionAlreadyClosed`.
    async fn close_last_reception(&self, pvz_id: PvzId) -> Result<Reception>;

    /// Appends a product to the open reception of a pickup point.
    ///
    /// Fails with `PvzNotFound` or `NoOpenReception`.
    async fn add_product(
        &self,
        pvz_id: PvzId,
        product_type: ProductType,
        creator: Option<UserId>,
    ) -> Result<Product>;

    /// Removes the most recently added product of the open reception.
    ///
    /// Fails with `PvzNotFound`, `NoOpenReception` or `EmptyReception`.
    async fn delete_last_product(&self, pvz_id: PvzId) -> Result<Product>;

    /// Fetches one window of the product join.
    ///
    /// Rows are ordered by pickup point, then reception, then product,
    /// each newest first, so rows that share a pickup point or reception
    /// are always contiguous.
    async fn product_rows(&self, query: ProductRowQuery) -> Result<Vec<ProductRow>>;
}
