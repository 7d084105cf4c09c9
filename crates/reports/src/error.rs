//! Report error types.

use accounting::AccountingError;
use domain::DomainError;
use order_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("Order store error: {0}")]
    Store(#[from] StoreError),

    /// Pulling documents from the accounting service failed.
    #[error("External service error: {0}")]
    Accounting(#[from] AccountingError),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, ReportError>;
