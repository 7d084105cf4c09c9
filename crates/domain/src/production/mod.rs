//! Production task board and FIFO allocation of produced units.

mod aggregated;

pub use aggregated::{AggregatedItems, OrderDemand, ProductDemand, aggregate_pending};

use chrono::Duration;
use chrono_tz::Tz;
use common::{LineItemId, OrderId};
use order_store::{OrderQuery, OrderStore, normalize_name};
use serde::Serialize;

use crate::error::DomainError;
use crate::order::{LineProductionStatus, Order, OrderError, ProductionStage};
use crate::repository::OrderRepository;

/// How long finished orders stay on the task board.
const FINISHED_VISIBILITY: Duration = Duration::hours(24);

/// Result of reporting produced units.
///
/// `distributed + remaining` always equals the reported quantity; a
/// non-zero `remaining` means more was made than open orders asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProductionOutcome {
    pub distributed: u32,
    pub remaining: u32,
}

/// Operator edit of a production task.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub stage: Option<ProductionStage>,
    pub notes: Option<String>,
}

impl TaskUpdate {
    fn validate(&self) -> Result<(), OrderError> {
        if self.stage.is_none() && self.notes.is_none() {
            return Err(OrderError::validation(
                "At least one field (stage or notes) is required",
            ));
        }
        if let Some(stage) = self.stage
            && !stage.is_manually_settable()
        {
            return Err(OrderError::InvalidStage(stage.to_string()));
        }
        Ok(())
    }

    fn apply(&self, order: &mut Order) -> Result<(), OrderError> {
        if let Some(stage) = self.stage {
            order.set_production_stage(stage)?;
        }
        if let Some(ref notes) = self.notes {
            order.set_production_notes(notes.clone());
        }
        Ok(())
    }
}

/// Result of a batch task update.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchUpdateResult {
    pub updated: Vec<OrderId>,
    pub missing: Vec<OrderId>,
}

/// Service behind the production floor: the task board and progress reports.
pub struct ProductionService<S: OrderStore> {
    repo: OrderRepository<S>,
    tz: Tz,
}

impl<S: OrderStore> ProductionService<S> {
    /// Creates a production service; `tz` decides which day "today" is.
    pub fn new(repo: OrderRepository<S>, tz: Tz) -> Self {
        Self { repo, tz }
    }

    fn active_query() -> OrderQuery {
        OrderQuery::new().production_stages(ProductionStage::ACTIVE.iter().map(|s| s.as_str()))
    }

    /// Returns the task board: every order still in production plus orders
    /// finished in the last 24 hours, earliest delivery first.
    ///
    /// Active orders whose delivery day has passed are flipped to `DELAYED`
    /// and saved along the way.
    #[tracing::instrument(skip(self))]
    pub async fn tasks(&self) -> Result<Vec<Order>, DomainError> {
        let now = self.repo.now();
        let today = now.with_timezone(&self.tz).date_naive();
        let tz = self.tz;

        let active = self.repo.find(Self::active_query()).await?;
        let recently_finished = self
            .repo
            .find(
                OrderQuery::new()
                    .production_stages([ProductionStage::Finished.as_str()])
                    .updated_since(now - FINISHED_VISIBILITY),
            )
            .await?;

        let mut tasks = Vec::with_capacity(active.len() + recently_finished.len());
        for mut order in active {
            let overdue = matches!(
                order.production_stage(),
                ProductionStage::Pending | ProductionStage::InProcess
            ) && order.is_overdue(tz, today);

            if overdue {
                (order, _) = self
                    .repo
                    .update(order, |o| Ok(o.mark_delayed_if_overdue(tz, today)))
                    .await?;
                tracing::info!(order_id = %order.id(), "order is overdue, marked delayed");
            }
            tasks.push(order);
        }
        tasks.extend(recently_finished);

        tasks.sort_by(|a, b| {
            a.delivery_date()
                .cmp(&b.delivery_date())
                .then(a.created_at().cmp(&b.created_at()))
        });
        Ok(tasks)
    }

    /// Changes the stage and/or notes of one order.
    #[tracing::instrument(skip(self))]
    pub async fn update_task(
        &self,
        order_id: OrderId,
        update: TaskUpdate,
    ) -> Result<Order, DomainError> {
        update.validate()?;
        let (order, _) = self
            .repo
            .execute(order_id, |order| update.apply(order))
            .await?;
        Ok(order)
    }

    /// Applies the same task update to several orders.
    ///
    /// Unknown ids are reported back rather than failing the batch.
    #[tracing::instrument(skip(self, order_ids), fields(count = order_ids.len()))]
    pub async fn batch_update_tasks(
        &self,
        order_ids: Vec<OrderId>,
        update: TaskUpdate,
    ) -> Result<BatchUpdateResult, DomainError> {
        if order_ids.is_empty() {
            return Err(OrderError::validation("At least one order id is required").into());
        }
        update.validate()?;

        let mut result = BatchUpdateResult::default();
        for order_id in order_ids {
            match self.repo.execute(order_id, |order| update.apply(order)).await {
                Ok(_) => result.updated.push(order_id),
                Err(DomainError::NotFound(_)) => result.missing.push(order_id),
                Err(e) => return Err(e),
            }
        }

        if !result.missing.is_empty() {
            tracing::warn!(missing = ?result.missing, "batch update skipped unknown orders");
        }
        Ok(result)
    }

    /// Sets the production flag of one line.
    #[tracing::instrument(skip(self))]
    pub async fn update_product_status(
        &self,
        order_id: OrderId,
        line_id: LineItemId,
        status: LineProductionStatus,
        notes: Option<String>,
    ) -> Result<Order, DomainError> {
        let (order, _) = self
            .repo
            .execute(order_id, |order| {
                order.set_line_status(line_id, status, notes.clone())
            })
            .await?;
        Ok(order)
    }

    /// Distributes produced units of a product across open orders, earliest
    /// delivery first.
    ///
    /// Each order is saved as soon as it has been served; a failure part way
    /// leaves earlier orders updated.
    #[tracing::instrument(skip(self))]
    pub async fn register_progress(
        &self,
        product_name: &str,
        quantity_made: u32,
    ) -> Result<ProductionOutcome, DomainError> {
        let name = normalize_name(product_name);
        if name.is_empty() {
            return Err(OrderError::validation("Product name is required").into());
        }
        if quantity_made == 0 {
            return Err(OrderError::InvalidQuantity {
                quantity: quantity_made,
            }
            .into());
        }

        let candidates = self
            .repo
            .find(Self::active_query().product_name(&name))
            .await?;

        let mut remaining = quantity_made;
        for order in candidates {
            if remaining == 0 {
                break;
            }
            if order.pending_units(&name) == 0 {
                continue;
            }

            let available = remaining;
            let (order, taken) = self
                .repo
                .update(order, |o| {
                    if o.production_stage().is_active() {
                        Ok(o.allocate_production(&name, available))
                    } else {
                        Ok(0)
                    }
                })
                .await?;
            remaining -= taken;

            tracing::debug!(
                order_id = %order.id(),
                taken,
                stage = %order.production_stage(),
                "allocated production"
            );
        }

        let distributed = quantity_made - remaining;
        metrics::counter!("production_units_distributed_total").increment(distributed as u64);
        if remaining > 0 {
            metrics::counter!("production_units_surplus_total").increment(remaining as u64);
            tracing::warn!(product = %name, remaining, "production exceeds open demand");
        }
        tracing::info!(product = %name, distributed, remaining, "production registered");

        Ok(ProductionOutcome {
            distributed,
            remaining,
        })
    }

    /// Pending units per product, bucketed into today (overdue included),
    /// tomorrow and later.
    #[tracing::instrument(skip(self))]
    pub async fn aggregated_items(&self) -> Result<AggregatedItems, DomainError> {
        let today = self.repo.now().with_timezone(&self.tz).date_naive();
        let active = self.repo.find(Self::active_query()).await?;
        Ok(aggregate_pending(&active, self.tz, today))
    }
}
