//! Order aggregate and related types.

mod aggregate;
mod dispatch;
#[cfg(test)]
pub(crate) mod fixtures;
mod line_item;
mod state;
mod value_objects;

pub use aggregate::{NewLineItem, NewOrder, Order};
pub use dispatch::{
    AUTO_DISPATCH_NOTE, AUTO_DISPATCH_REPORTER, DispatchItem, DispatchRecord, EDIT_WINDOW,
    derive_dispatch_status,
};
pub use line_item::LineItem;
pub use state::{
    Branch, DeliveryType, DispatchStatus, LineProductionStatus, ProductionStage, SyncStatus,
};
pub use value_objects::{InvoiceData, Money, PaymentDetails};

use chrono::{DateTime, Utc};
use common::{DispatchId, LineItemId, OrderId};
use thiserror::Error;

/// Errors raised by order business rules.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Missing or malformed input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Invalid quantity.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// The order has no line with this id.
    #[error("Line item not found: {0}")]
    LineItemNotFound(LineItemId),

    /// The order has no dispatch record with this id.
    #[error("Dispatch not found: {0}")]
    DispatchNotFound(DispatchId),

    /// The dispatch record is older than the edit window.
    #[error("Dispatch {dispatch_id} reported at {reported_at} can no longer be edited")]
    EditWindowExpired {
        dispatch_id: DispatchId,
        reported_at: DateTime<Utc>,
    },

    /// Invoice data is frozen once the invoice is issued.
    #[error("Invoice for order {0} has already been processed")]
    InvoiceAlreadyProcessed(OrderId),

    /// Unknown stage, or one that can't be set by hand.
    #[error("Invalid production stage: {0}")]
    InvalidStage(String),
}

impl OrderError {
    pub fn validation(message: impl Into<String>) -> Self {
        OrderError::Validation(message.into())
    }
}
