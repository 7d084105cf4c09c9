//! Order intake and invoice requests.

use chrono_tz::Tz;
use common::OrderId;
use order_store::{OrderQuery, OrderSort, OrderStore};
use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::order::{InvoiceData, NewOrder, Order};
use crate::repository::OrderRepository;

/// How many orders the order list returns.
pub const LIST_LIMIT: usize = 100;

/// A stored order with the message to send back to the customer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacedOrder {
    pub order: Order,
    pub confirmation_message: String,
}

/// Changes to an order's invoice request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceUpdate {
    #[serde(default)]
    pub invoice_needed: Option<bool>,
    #[serde(default)]
    pub invoice_data: Option<InvoiceData>,
}

pub struct OrderService<S: OrderStore> {
    repo: OrderRepository<S>,
    tz: Tz,
    business_name: String,
}

impl<S: OrderStore> OrderService<S> {
    pub fn new(repo: OrderRepository<S>, tz: Tz, business_name: impl Into<String>) -> Self {
        Self {
            repo,
            tz,
            business_name: business_name.into(),
        }
    }

    /// Validates and stores a new order.
    #[tracing::instrument(skip(self, new), fields(customer = %new.customer_name))]
    pub async fn create_order(&self, new: NewOrder) -> Result<PlacedOrder, DomainError> {
        let mut order = Order::place(new, self.repo.now())?;
        self.repo.insert(&mut order).await?;

        metrics::counter!("orders_created_total").increment(1);
        tracing::info!(
            order_id = %order.id(),
            lines = order.products().len(),
            total = %order.total_value(),
            "order created"
        );

        let confirmation_message = order.confirmation_message(&self.business_name, self.tz);
        Ok(PlacedOrder {
            order,
            confirmation_message,
        })
    }

    /// Latest orders, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<Order>, DomainError> {
        self.repo
            .find(
                OrderQuery::new()
                    .sort(OrderSort::CreatedAtDesc)
                    .limit(LIST_LIMIT),
            )
            .await
    }

    pub async fn get_order(&self, order_id: OrderId) -> Result<Order, DomainError> {
        self.repo.load(order_id).await
    }

    /// Changes whether an invoice is wanted and the data to issue it with.
    #[tracing::instrument(skip(self, update))]
    pub async fn update_invoice_data(
        &self,
        order_id: OrderId,
        update: InvoiceUpdate,
    ) -> Result<Order, DomainError> {
        let (order, _) = self
            .repo
            .execute(order_id, |order| {
                order.update_invoice_request(update.invoice_needed, update.invoice_data.clone())
            })
            .await?;
        Ok(order)
    }
}
