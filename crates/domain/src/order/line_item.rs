use common::LineItemId;
use order_store::normalize_name;
use serde::{Deserialize, Serialize};

use super::{LineProductionStatus, Money};

/// A product line within an order.
///
/// Lines are addressed by `id`; `name` is only used to match reported
/// production and dispatch against orders, and for grouping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub id: LineItemId,

    pub name: String,

    /// Units ordered. Always greater than zero.
    pub quantity: u32,

    /// Unit price.
    pub price: Money,

    /// Product id in the accounting service, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accounting_product_id: Option<String>,

    /// Units produced so far. Never decreases.
    #[serde(default)]
    pub produced: u32,

    #[serde(default)]
    pub production_status: LineProductionStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production_notes: Option<String>,
}

impl LineItem {
    /// Creates a new, unproduced line.
    pub fn new(name: impl Into<String>, quantity: u32, price: Money) -> Self {
        Self {
            id: LineItemId::new(),
            name: name.into(),
            quantity,
            price,
            accounting_product_id: None,
            produced: 0,
            production_status: LineProductionStatus::Pending,
            production_notes: None,
        }
    }

    /// Returns true if this line carries the given normalized product name.
    pub fn matches(&self, normalized_name: &str) -> bool {
        normalize_name(&self.name) == normalized_name
    }

    /// Units still to be produced.
    pub fn pending(&self) -> u32 {
        self.quantity.saturating_sub(self.produced)
    }

    /// Returns true if the line is fully produced.
    pub fn is_done(&self) -> bool {
        self.produced >= self.quantity
    }

    /// Returns quantity times unit price.
    pub fn line_total(&self) -> Money {
        self.price.multiply(self.quantity)
    }

    /// Adds up to `available` units of production and returns how many were taken.
    pub(crate) fn produce(&mut self, available: u32) -> u32 {
        let take = self.pending().min(available);
        if take > 0 {
            self.produced += take;
            self.production_status = if self.is_done() {
                LineProductionStatus::Completed
            } else {
                LineProductionStatus::InProcess
            };
        }
        take
    }

    /// Sets the production flag. `COMPLETED` brings `produced` up to `quantity`.
    pub(crate) fn set_status(&mut self, status: LineProductionStatus) {
        if status == LineProductionStatus::Completed {
            self.produced = self.produced.max(self.quantity);
        }
        self.production_status = status;
    }
}
