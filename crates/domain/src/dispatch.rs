//! Dispatch reconciliation: shipped quantities matched against open orders.

use common::{DispatchId, OrderId};
use order_store::{OrderQuery, OrderStore, normalize_name};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::order::{DeliveryType, DispatchItem, DispatchRecord, DispatchStatus, Order, OrderError};
use crate::repository::OrderRepository;

/// Reporter recorded when a manual dispatch doesn't name one.
pub const DEFAULT_REPORTER: &str = "Producción";

/// Where a dispatch report is headed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    /// Home delivery.
    Delivery,
    /// Customer pickup at the branch whose name contains the fragment.
    Pickup { branch: String },
}

impl Destination {
    /// Reads a free-text destination.
    ///
    /// Anything mentioning delivery goes to delivery orders; everything else
    /// is taken as a branch name fragment.
    pub fn parse(destination: &str) -> Result<Destination, OrderError> {
        let trimmed = destination.trim();
        if trimmed.is_empty() {
            return Err(OrderError::validation("Destination is required"));
        }
        let lowered = trimmed.to_lowercase();
        if lowered.contains("delivery") || lowered.contains("domicilio") {
            Ok(Destination::Delivery)
        } else {
            Ok(Destination::Pickup {
                branch: trimmed.to_string(),
            })
        }
    }

    fn query(&self) -> OrderQuery {
        let query = OrderQuery::new().exclude_dispatch_statuses([DispatchStatus::Sent.as_str()]);
        match self {
            Destination::Delivery => query.delivery_type(DeliveryType::Delivery.as_str()),
            Destination::Pickup { branch } => query
                .delivery_type(DeliveryType::Pickup.as_str())
                .branch_contains(branch),
        }
    }
}

/// One product line of a dispatch report.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportedItem {
    pub name: String,
    pub quantity: u32,
}

/// How one reported item was spread over orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchOutcome {
    pub item: String,
    pub requested: u32,
    pub distributed: u32,
    pub remaining: u32,
}

/// A dispatch record entered by hand against one order.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDispatch {
    pub destination: String,
    pub items: Vec<DispatchItem>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub reported_by: Option<String>,
}

/// Changes to an existing dispatch record.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DispatchEdit {
    #[serde(default)]
    pub items: Option<Vec<DispatchItem>>,
    #[serde(default)]
    pub notes: Option<String>,
}

pub struct DispatchService<S: OrderStore> {
    repo: OrderRepository<S>,
}

impl<S: OrderStore> DispatchService<S> {
    pub fn new(repo: OrderRepository<S>) -> Self {
        Self { repo }
    }

    /// Spreads shipped quantities over the open orders for `destination`,
    /// earliest delivery first.
    ///
    /// A line only receives what has been produced for it and is still owed.
    /// Whatever can't be placed comes back as `remaining`.
    #[tracing::instrument(skip(self, items), fields(items = items.len()))]
    pub async fn register_progress(
        &self,
        destination: &str,
        items: Vec<ReportedItem>,
    ) -> Result<Vec<DispatchOutcome>, DomainError> {
        let target = Destination::parse(destination)?;
        if items.is_empty() {
            return Err(OrderError::validation("At least one item is required").into());
        }
        for item in &items {
            if item.name.trim().is_empty() {
                return Err(OrderError::validation("Item name is required").into());
            }
            if item.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    quantity: item.quantity,
                }
                .into());
            }
        }

        let mut outcomes = Vec::with_capacity(items.len());
        for item in items {
            outcomes.push(self.reconcile_item(&target, destination.trim(), item).await?);
        }
        Ok(outcomes)
    }

    async fn reconcile_item(
        &self,
        target: &Destination,
        destination: &str,
        item: ReportedItem,
    ) -> Result<DispatchOutcome, DomainError> {
        let name = normalize_name(&item.name);
        let candidates = self.repo.find(target.query().product_name(&name)).await?;

        let mut remaining = item.quantity;
        for order in candidates {
            if remaining == 0 {
                break;
            }

            let available = remaining;
            let now = self.repo.now();
            let (order, placed) = self
                .repo
                .update(order, |o| Ok(o.dispatch_product(&name, destination, available, now)))
                .await?;
            remaining -= placed;

            if placed > 0 {
                tracing::debug!(
                    order_id = %order.id(),
                    placed,
                    status = %order.dispatch_status(),
                    "allocated dispatch"
                );
            }
        }

        let distributed = item.quantity - remaining;
        metrics::counter!("dispatch_units_distributed_total").increment(distributed as u64);
        if remaining > 0 {
            metrics::counter!("dispatch_units_surplus_total").increment(remaining as u64);
            tracing::warn!(product = %name, remaining, destination, "dispatch exceeds open demand");
        }
        tracing::info!(product = %name, distributed, remaining, destination, "dispatch registered");

        Ok(DispatchOutcome {
            item: item.name,
            requested: item.quantity,
            distributed,
            remaining,
        })
    }

    /// Appends a hand-entered dispatch record to one order.
    #[tracing::instrument(skip(self, dispatch))]
    pub async fn register_dispatch(
        &self,
        order_id: OrderId,
        dispatch: NewDispatch,
    ) -> Result<(Order, DispatchId), DomainError> {
        let now = self.repo.now();
        let reported_by = dispatch
            .reported_by
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REPORTER.to_string());
        let record = DispatchRecord::new(
            dispatch.destination.trim(),
            dispatch.items,
            dispatch.notes,
            reported_by,
            now,
        );
        let dispatch_id = record.id;

        let (order, _) = self
            .repo
            .execute(order_id, |order| order.add_dispatch(record.clone()))
            .await?;
        Ok((order, dispatch_id))
    }

    /// Edits a dispatch record inside its edit window.
    #[tracing::instrument(skip(self, edit))]
    pub async fn update_dispatch(
        &self,
        order_id: OrderId,
        dispatch_id: DispatchId,
        edit: DispatchEdit,
    ) -> Result<Order, DomainError> {
        let now = self.repo.now();
        let result = self
            .repo
            .execute(order_id, |order| {
                order.edit_dispatch(dispatch_id, edit.items.clone(), edit.notes.clone(), now)
            })
            .await;

        match result {
            Ok((order, _)) => Ok(order),
            Err(DomainError::Order(e @ OrderError::EditWindowExpired { .. })) => {
                tracing::warn!(%order_id, %dispatch_id, "dispatch edit after window closed");
                Err(e.into())
            }
            Err(e) => Err(e),
        }
    }
}
