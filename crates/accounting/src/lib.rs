//! Integration with the external accounting service.
//!
//! - `AccountingService` is the seam every caller goes through
//! - `HttpAccountingClient` talks to the real API, `InMemoryAccountingService`
//!   stands in for it in tests and credential-less runs
//! - `BillingService` issues pending invoices and registers collections

pub mod billing;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod invoice;
pub mod memory;

pub use billing::{BillingService, DEFAULT_BATCH_SIZE, InvoiceBatchReport, InvoiceFailure};
pub use client::{AccountingService, DocumentFilter, Person, ProductFilter, document_total};
pub use config::AccountingConfig;
pub use error::{AccountingError, Result};
pub use http::HttpAccountingClient;
pub use invoice::{CollectionPayload, InvoiceCustomer, InvoiceLine, InvoicePayload, InvoiceSettings};
pub use memory::InMemoryAccountingService;
