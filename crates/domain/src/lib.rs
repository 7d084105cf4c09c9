//! Order domain for the bakery backend.
//!
//! This crate provides:
//! - The `Order` aggregate with its production and dispatch status rules
//! - `OrderRepository` for versioned load/mutate/save cycles
//! - `ProductionService` for the task board and FIFO production allocation
//! - `DispatchService` for matching shipped quantities to open orders
//! - `OrderService` for order intake

pub mod clock;
pub mod dispatch;
pub mod error;
pub mod order;
pub mod orders;
pub mod production;
pub mod repository;

pub use clock::{Clock, FixedClock, SystemClock};
pub use dispatch::{
    Destination, DispatchEdit, DispatchOutcome, DispatchService, NewDispatch, ReportedItem,
};
pub use error::DomainError;
pub use order::{
    Branch, DeliveryType, DispatchItem, DispatchRecord, DispatchStatus, InvoiceData, LineItem,
    LineProductionStatus, Money, NewLineItem, NewOrder, Order, OrderError, PaymentDetails,
    ProductionStage, SyncStatus,
};
pub use orders::{InvoiceUpdate, OrderService, PlacedOrder};
pub use production::{
    AggregatedItems, BatchUpdateResult, ProductionOutcome, ProductionService, TaskUpdate,
};
pub use repository::OrderRepository;
