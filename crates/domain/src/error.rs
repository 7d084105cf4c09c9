//! Domain error types.

use common::OrderId;
use order_store::StoreError;
use thiserror::Error;

use crate::order::OrderError;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the order store.
    #[error("Order store error: {0}")]
    Store(#[from] StoreError),

    /// An order business rule rejected the operation.
    #[error("{0}")]
    Order(#[from] OrderError),

    /// Order not found.
    #[error("Order not found: {0}")]
    NotFound(OrderId),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The accounting service failed. Local writes made before the call stand.
    #[error("External service error: {0}")]
    ExternalService(String),
}

impl DomainError {
    /// Returns true if the error came from a lost optimistic-concurrency race.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DomainError::Store(StoreError::ConcurrencyConflict { .. }))
    }
}
