//! Domain layer for the PVZ service.
//!
//! This crate provides:
//! - [`LifecycleEngine`] enforcing the reception state machine and LIFO removal
//! - [`PvzQuery`] rebuilding the nested pickup point listing from the product join
//! - [`IdentityService`] for registration and credential checks
//! - [`policy::authorize`] mapping roles to permitted operations

pub mod error;
pub mod identity;
pub mod lifecycle;
pub mod policy;
pub mod query;

pub use error::DomainError;
pub use identity::{Argon2Hasher, IdentityService, SecretHasher};
pub use lifecycle::{CreatePvz, LifecycleEngine};
pub use policy::{Decision, Operation, authorize};
pub use query::{ListParams, ProductView, PvzQuery, PvzView, ReceptionView, group_rows};
