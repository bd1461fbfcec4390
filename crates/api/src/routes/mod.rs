//! HTTP handlers grouped by resource.

pub mod auth;
pub mod metrics;
pub mod ping;
pub mod products;
pub mod pvz;
pub mod receptions;
