//! API error types with HTTP response mapping.

use accounting::AccountingError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{DomainError, OrderError};
use reports::ReportError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Domain logic error.
    Domain(DomainError),
    /// Direct accounting service call failed.
    Accounting(AccountingError),
    /// Report or analytics error.
    Report(ReportError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Domain(err) => domain_error_to_response(err),
            ApiError::Accounting(err) => accounting_error_to_response(err),
            ApiError::Report(err) => report_error_to_response(err),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        metrics::counter!("http_errors_total", "status" => status.as_u16().to_string())
            .increment(1);
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), error = %message, "request failed");
        }

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn domain_error_to_response(err: DomainError) -> (StatusCode, String) {
    let status = match &err {
        DomainError::Order(order_err) => match order_err {
            OrderError::Validation(_)
            | OrderError::InvalidQuantity { .. }
            | OrderError::InvalidStage(_)
            | OrderError::LineItemNotFound(_) => StatusCode::BAD_REQUEST,
            OrderError::DispatchNotFound(_) => StatusCode::NOT_FOUND,
            OrderError::EditWindowExpired { .. } | OrderError::InvoiceAlreadyProcessed(_) => {
                StatusCode::CONFLICT
            }
        },
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::ExternalService(_) => StatusCode::BAD_GATEWAY,
        e if e.is_conflict() => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

fn accounting_error_to_response(err: AccountingError) -> (StatusCode, String) {
    let status = match &err {
        AccountingError::Validation(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::BAD_GATEWAY,
    };
    (status, err.to_string())
}

fn report_error_to_response(err: ReportError) -> (StatusCode, String) {
    match err {
        ReportError::Domain(e) => domain_error_to_response(e),
        ReportError::Validation(_) => (StatusCode::BAD_REQUEST, err.to_string()),
        ReportError::Accounting(_) => (StatusCode::BAD_GATEWAY, err.to_string()),
        ReportError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Domain(err)
    }
}

impl From<AccountingError> for ApiError {
    fn from(err: AccountingError) -> Self {
        ApiError::Accounting(err)
    }
}

impl From<ReportError> for ApiError {
    fn from(err: ReportError) -> Self {
        ApiError::Report(err)
    }
}
