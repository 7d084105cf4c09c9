//! Shared identifier types.

mod types;

pub use types::{DispatchId, LineItemId, OrderId};
