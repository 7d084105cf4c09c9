pub mod document;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;
pub mod summary;

pub use common::OrderId;
pub use document::{OrderDocument, Version};
pub use error::{Result, StoreError};
pub use memory::InMemoryOrderStore;
pub use postgres::PostgresOrderStore;
pub use query::{OrderQuery, OrderSort, normalize_name};
pub use store::{OrderStore, OrderStoreExt, SaveOptions, SummaryStore};
pub use summary::DailySummary;
