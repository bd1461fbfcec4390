pub mod error;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

pub use common::{City, ProductId, ProductType, PvzId, ReceptionId, ReceptionStatus, Role, UserId};
pub use error::{Result, StoreError};
pub use memory::InMemoryPvzStore;
pub use postgres::PostgresPvzStore;
pub use record::{NewPvz, NewUser, Product, ProductRow, ProductRowQuery, Pvz, Reception, User};
pub use store::PvzStore;
