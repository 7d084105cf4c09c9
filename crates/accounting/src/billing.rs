//! Billing jobs: issuing pending invoices and registering collections.

use std::sync::Arc;

use chrono_tz::Tz;
use common::OrderId;
use domain::{DomainError, Order, OrderRepository, PaymentDetails, SyncStatus};
use order_store::{OrderQuery, OrderStore};
use serde::Serialize;
use serde_json::Value;

use crate::client::AccountingService;
use crate::error::AccountingError;
use crate::invoice::{CollectionPayload, InvoicePayload, InvoiceSettings};

/// Invoices issued per batch run.
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Outcome of one batch run.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceBatchReport {
    pub processed: usize,
    pub failed: usize,
    pub errors: Vec<InvoiceFailure>,
    /// Pending invoices left for later runs.
    pub remaining: usize,
    /// Pending invoices when the run started.
    pub total_pending: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceFailure {
    pub order_id: OrderId,
    pub error: String,
}

fn external(err: AccountingError) -> DomainError {
    DomainError::ExternalService(err.to_string())
}

pub struct BillingService<S: OrderStore> {
    repo: OrderRepository<S>,
    accounting: Arc<dyn AccountingService>,
    settings: InvoiceSettings,
    batch_size: usize,
    tz: Tz,
}

impl<S: OrderStore> BillingService<S> {
    pub fn new(
        repo: OrderRepository<S>,
        accounting: Arc<dyn AccountingService>,
        settings: InvoiceSettings,
        tz: Tz,
    ) -> Self {
        Self {
            repo,
            accounting,
            settings,
            batch_size: DEFAULT_BATCH_SIZE,
            tz,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn accounting(&self) -> &Arc<dyn AccountingService> {
        &self.accounting
    }

    fn pending_query() -> OrderQuery {
        OrderQuery::new()
            .invoice_needed(true)
            .invoice_status(SyncStatus::Pending.as_str())
    }

    /// Issues invoices for up to one batch of orders waiting for one.
    ///
    /// Each order ends up `PROCESSED` with the accounting response or `ERROR`
    /// with the failure message; one failure doesn't stop the batch.
    #[tracing::instrument(skip(self))]
    pub async fn process_pending_invoices(&self) -> Result<InvoiceBatchReport, DomainError> {
        let total_pending = self.repo.count(Self::pending_query()).await?;
        if total_pending == 0 {
            tracing::info!("no pending invoices");
            return Ok(InvoiceBatchReport::default());
        }

        let batch = self
            .repo
            .find(Self::pending_query().limit(self.batch_size))
            .await?;
        tracing::info!(batch = batch.len(), total_pending, "processing invoice batch");

        let issued_on = self.repo.now().with_timezone(&self.tz).date_naive();
        let mut report = InvoiceBatchReport {
            total_pending,
            remaining: total_pending.saturating_sub(batch.len()),
            ..InvoiceBatchReport::default()
        };

        for order in batch {
            let order_id = order.id();
            match self.issue_invoice(&order, issued_on).await {
                Ok(info) => {
                    self.repo
                        .update(order, |o| {
                            o.mark_invoice_processed(info.clone());
                            Ok(())
                        })
                        .await?;
                    metrics::counter!("invoices_processed_total").increment(1);
                    report.processed += 1;
                }
                Err(err) => {
                    let message = err.to_string();
                    tracing::warn!(%order_id, error = %message, "invoice failed");
                    self.repo
                        .update(order, |o| {
                            o.mark_invoice_failed(message.clone());
                            Ok(())
                        })
                        .await?;
                    metrics::counter!("invoices_failed_total").increment(1);
                    report.failed += 1;
                    report.errors.push(InvoiceFailure {
                        order_id,
                        error: message,
                    });
                }
            }
        }

        tracing::info!(
            processed = report.processed,
            failed = report.failed,
            remaining = report.remaining,
            "invoice batch done"
        );
        Ok(report)
    }

    async fn issue_invoice(
        &self,
        order: &Order,
        issued_on: chrono::NaiveDate,
    ) -> Result<Value, AccountingError> {
        let invoice = InvoicePayload::for_order(order, &self.settings, issued_on)?;
        self.accounting.create_invoice(&invoice).await
    }

    /// Records a payment on an invoiced order and registers it with the
    /// accounting service.
    ///
    /// The payment is stored first. If the accounting call fails the order
    /// keeps the payment with collection status `ERROR` and the failure is
    /// returned as `ExternalService`.
    #[tracing::instrument(skip(self, payment))]
    pub async fn register_collection(
        &self,
        order_id: OrderId,
        payment: PaymentDetails,
    ) -> Result<Order, DomainError> {
        let (order, _) = self
            .repo
            .execute(order_id, |o| o.record_payment(payment.clone()))
            .await?;

        let document_id = order
            .invoice_info()
            .and_then(|info| info.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let result = match document_id {
            Some(ref id) => {
                let collection = CollectionPayload::from_payment(&payment);
                self.accounting.register_collection(id, &collection).await
            }
            None => Err(AccountingError::Validation(
                "Issued invoice has no accounting document id".to_string(),
            )),
        };

        match result {
            Ok(_) => {
                let (order, _) = self
                    .repo
                    .update(order, |o| {
                        o.mark_collection_processed();
                        Ok(())
                    })
                    .await?;
                tracing::info!(%order_id, amount = %payment.amount, "collection registered");
                Ok(order)
            }
            Err(err) => {
                let message = err.to_string();
                tracing::warn!(%order_id, error = %message, "collection failed");
                self.repo
                    .update(order, |o| {
                        o.mark_collection_failed(message.clone());
                        Ok(())
                    })
                    .await?;
                Err(external(err))
            }
        }
    }
}
