//! Shared identifiers and value types for the PVZ service.

pub mod types;
pub mod values;

pub use types::{IdParseError, ProductId, PvzId, ReceptionId, UserId};
pub use values::{City, ProductType, ReceptionStatus, Role, UnknownValue};
