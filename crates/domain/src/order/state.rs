//! Status tags carried by an order and its lines.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::OrderError;

/// Where an order stands on the production floor.
///
/// ```text
/// PENDING ──► IN_PROCESS ──► FINISHED
///    │             │
///    └─────────────┴──► DELAYED (delivery day passed)
/// ```
///
/// `FINISHED` holds exactly when every line is fully produced, unless an
/// operator overrides the stage by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductionStage {
    #[default]
    Pending,
    InProcess,
    Finished,
    Delayed,
}

impl ProductionStage {
    /// Stages that still accept produced units.
    pub const ACTIVE: [ProductionStage; 3] = [
        ProductionStage::Pending,
        ProductionStage::InProcess,
        ProductionStage::Delayed,
    ];

    /// Returns true if the order still needs production.
    pub fn is_active(&self) -> bool {
        !matches!(self, ProductionStage::Finished)
    }

    /// Returns true if an operator may set this stage directly.
    ///
    /// `DELAYED` is only ever assigned by the overdue check.
    pub fn is_manually_settable(&self) -> bool {
        !matches!(self, ProductionStage::Delayed)
    }

    /// Returns the stage tag as stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductionStage::Pending => "PENDING",
            ProductionStage::InProcess => "IN_PROCESS",
            ProductionStage::Finished => "FINISHED",
            ProductionStage::Delayed => "DELAYED",
        }
    }
}

impl std::fmt::Display for ProductionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProductionStage {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ProductionStage::Pending),
            "IN_PROCESS" => Ok(ProductionStage::InProcess),
            "FINISHED" => Ok(ProductionStage::Finished),
            "DELAYED" => Ok(ProductionStage::Delayed),
            other => Err(OrderError::InvalidStage(other.to_string())),
        }
    }
}

/// Production flag of a single line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineProductionStatus {
    #[default]
    Pending,
    InProcess,
    Completed,
}

impl LineProductionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineProductionStatus::Pending => "PENDING",
            LineProductionStatus::InProcess => "IN_PROCESS",
            LineProductionStatus::Completed => "COMPLETED",
        }
    }
}

impl std::fmt::Display for LineProductionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregate dispatch status, always derived from the dispatch records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchStatus {
    /// Nothing sent yet.
    #[default]
    NotSent,

    /// Some lines are short.
    Partial,

    /// Every line sent exactly as ordered.
    Sent,

    /// At least one line was sent more than ordered.
    Problem,
}

impl DispatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchStatus::NotSent => "NOT_SENT",
            DispatchStatus::Partial => "PARTIAL",
            DispatchStatus::Sent => "SENT",
            DispatchStatus::Problem => "PROBLEM",
        }
    }
}

impl std::fmt::Display for DispatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the order reaches the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryType {
    Delivery,
    /// Customer picks up at a branch. Older clients send `retiro`.
    #[serde(alias = "retiro")]
    Pickup,
}

impl DeliveryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryType::Delivery => "delivery",
            DeliveryType::Pickup => "pickup",
        }
    }
}

impl std::fmt::Display for DeliveryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Bakery locations that hand out or ship orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Branch {
    #[serde(rename = "San Marino")]
    SanMarino,
    #[serde(rename = "Mall del Sol")]
    MallDelSol,
    #[serde(rename = "Centro de Producción")]
    ProductionCenter,
}

impl Branch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Branch::SanMarino => "San Marino",
            Branch::MallDelSol => "Mall del Sol",
            Branch::ProductionCenter => "Centro de Producción",
        }
    }
}

impl std::fmt::Display for Branch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Progress of a record pushed to the accounting service.
///
/// Used for both the invoice and the payment collection of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    Pending,
    Processed,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Pending => "PENDING",
            SyncStatus::Processed => "PROCESSED",
            SyncStatus::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
