//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use common::{DispatchId, LineItemId, OrderId};
use order_store::{OrderDocument, Version, normalize_name};
use serde::{Deserialize, Serialize};

use super::{
    Branch, DeliveryType, DispatchItem, DispatchRecord, DispatchStatus, InvoiceData, LineItem,
    LineProductionStatus, Money, OrderError, PaymentDetails, ProductionStage, SyncStatus,
    derive_dispatch_status,
    dispatch::{AUTO_DISPATCH_NOTE, AUTO_DISPATCH_REPORTER},
};

const DEFAULT_CHANNEL: &str = "Web";
const DEFAULT_RESPONSIBLE: &str = "Web";
const DEFAULT_PAYMENT_METHOD: &str = "Por confirmar";

/// Order aggregate root.
///
/// All mutation goes through the methods below so the derived fields
/// (production stage, dispatch status) never drift from the lines and
/// dispatches they summarize. Persisted whole as an [`OrderDocument`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: OrderId,

    /// Version as loaded from the store; 0 until first inserted.
    #[serde(default)]
    version: Version,

    order_date: DateTime<Utc>,
    delivery_date: DateTime<Utc>,
    delivery_time: String,

    customer_name: String,
    #[serde(default)]
    customer_phone: Option<String>,
    sales_channel: String,

    products: Vec<LineItem>,

    delivery_type: DeliveryType,
    #[serde(default)]
    branch: Option<Branch>,
    #[serde(default)]
    google_maps_link: Option<String>,
    #[serde(default)]
    delivery_address: Option<String>,

    total_value: Money,
    #[serde(default)]
    delivery_value: Money,
    payment_method: String,
    responsible: String,
    #[serde(default)]
    comments: Option<String>,

    #[serde(default)]
    invoice_needed: bool,
    #[serde(default)]
    invoice_data: Option<InvoiceData>,
    #[serde(default)]
    invoice_status: Option<SyncStatus>,
    /// Raw response of the accounting service for the issued invoice.
    #[serde(default)]
    invoice_info: Option<serde_json::Value>,
    #[serde(default)]
    invoice_error: Option<String>,

    #[serde(default)]
    payment_details: Option<PaymentDetails>,
    #[serde(default)]
    collection_status: Option<SyncStatus>,
    #[serde(default)]
    collection_error: Option<String>,

    production_stage: ProductionStage,
    #[serde(default)]
    production_notes: String,

    #[serde(default)]
    dispatches: Vec<DispatchRecord>,
    dispatch_status: DispatchStatus,

    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// A line as submitted by the customer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLineItem {
    pub name: String,
    pub quantity: u32,
    pub price: Money,
    #[serde(default)]
    pub accounting_product_id: Option<String>,
}

/// An order as submitted by the customer or the sales staff.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    #[serde(default)]
    pub order_date: Option<DateTime<Utc>>,
    pub delivery_date: DateTime<Utc>,
    #[serde(default)]
    pub delivery_time: Option<String>,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_phone: Option<String>,
    #[serde(default)]
    pub sales_channel: Option<String>,
    #[serde(default)]
    pub products: Vec<NewLineItem>,
    pub delivery_type: DeliveryType,
    #[serde(default)]
    pub branch: Option<Branch>,
    #[serde(default)]
    pub google_maps_link: Option<String>,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub total_value: Option<Money>,
    #[serde(default)]
    pub delivery_value: Option<Money>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub responsible: Option<String>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub production_notes: Option<String>,
    #[serde(default)]
    pub invoice_needed: bool,
    #[serde(default)]
    pub invoice_data: Option<InvoiceData>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// Creation
impl Order {
    /// Validates a submitted order and builds the aggregate.
    pub fn place(new: NewOrder, now: DateTime<Utc>) -> Result<Order, OrderError> {
        let customer_name = new.customer_name.trim().to_string();
        if customer_name.is_empty() || new.products.is_empty() {
            return Err(OrderError::validation(
                "Customer name and products are required",
            ));
        }

        let delivery_time = non_blank(new.delivery_time)
            .ok_or_else(|| OrderError::validation("Delivery time is required"))?;

        let google_maps_link = non_blank(new.google_maps_link);
        let delivery_address = non_blank(new.delivery_address);
        if new.delivery_type == DeliveryType::Delivery
            && (google_maps_link.is_none() || delivery_address.is_none())
        {
            return Err(OrderError::validation(
                "Delivery orders need a Google Maps link and a delivery address",
            ));
        }

        let mut products = Vec::with_capacity(new.products.len());
        for item in new.products {
            let name = item.name.trim().to_string();
            if name.is_empty() {
                return Err(OrderError::validation("Product name is required"));
            }
            if item.quantity == 0 {
                return Err(OrderError::InvalidQuantity {
                    quantity: item.quantity,
                });
            }
            if item.price.is_negative() {
                return Err(OrderError::validation(format!(
                    "Invalid price for {name}: {}",
                    item.price
                )));
            }
            let mut line = LineItem::new(name, item.quantity, item.price);
            line.accounting_product_id = non_blank(item.accounting_product_id);
            products.push(line);
        }

        let total_value = new
            .total_value
            .unwrap_or_else(|| products.iter().map(LineItem::line_total).sum());

        let invoice_status = new.invoice_needed.then_some(SyncStatus::Pending);

        Ok(Order {
            id: OrderId::new(),
            version: Version::initial(),
            order_date: new.order_date.unwrap_or(now),
            delivery_date: new.delivery_date,
            delivery_time,
            customer_name,
            customer_phone: non_blank(new.customer_phone),
            sales_channel: non_blank(new.sales_channel)
                .unwrap_or_else(|| DEFAULT_CHANNEL.to_string()),
            products,
            delivery_type: new.delivery_type,
            branch: new.branch,
            google_maps_link,
            delivery_address,
            total_value,
            delivery_value: new.delivery_value.unwrap_or_default(),
            payment_method: non_blank(new.payment_method)
                .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
            responsible: non_blank(new.responsible)
                .unwrap_or_else(|| DEFAULT_RESPONSIBLE.to_string()),
            comments: non_blank(new.comments),
            invoice_needed: new.invoice_needed,
            invoice_data: new.invoice_data,
            invoice_status,
            invoice_info: None,
            invoice_error: None,
            payment_details: None,
            collection_status: None,
            collection_error: None,
            production_stage: ProductionStage::Pending,
            production_notes: new.production_notes.unwrap_or_default(),
            dispatches: Vec::new(),
            dispatch_status: DispatchStatus::NotSent,
            created_at: now,
            updated_at: now,
        })
    }
}

// Query methods
impl Order {
    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn order_date(&self) -> DateTime<Utc> {
        self.order_date
    }

    pub fn delivery_date(&self) -> DateTime<Utc> {
        self.delivery_date
    }

    pub fn delivery_time(&self) -> &str {
        &self.delivery_time
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn customer_phone(&self) -> Option<&str> {
        self.customer_phone.as_deref()
    }

    pub fn products(&self) -> &[LineItem] {
        &self.products
    }

    /// Returns a line by id.
    pub fn line(&self, line_id: LineItemId) -> Option<&LineItem> {
        self.products.iter().find(|l| l.id == line_id)
    }

    pub fn delivery_type(&self) -> DeliveryType {
        self.delivery_type
    }

    pub fn branch(&self) -> Option<Branch> {
        self.branch
    }

    pub fn delivery_address(&self) -> Option<&str> {
        self.delivery_address.as_deref()
    }

    pub fn total_value(&self) -> Money {
        self.total_value
    }

    pub fn delivery_value(&self) -> Money {
        self.delivery_value
    }

    pub fn payment_method(&self) -> &str {
        &self.payment_method
    }

    pub fn invoice_needed(&self) -> bool {
        self.invoice_needed
    }

    pub fn invoice_data(&self) -> Option<&InvoiceData> {
        self.invoice_data.as_ref()
    }

    pub fn invoice_status(&self) -> Option<SyncStatus> {
        self.invoice_status
    }

    pub fn invoice_info(&self) -> Option<&serde_json::Value> {
        self.invoice_info.as_ref()
    }

    pub fn invoice_error(&self) -> Option<&str> {
        self.invoice_error.as_deref()
    }

    pub fn payment_details(&self) -> Option<&PaymentDetails> {
        self.payment_details.as_ref()
    }

    pub fn collection_status(&self) -> Option<SyncStatus> {
        self.collection_status
    }

    pub fn collection_error(&self) -> Option<&str> {
        self.collection_error.as_deref()
    }

    pub fn production_stage(&self) -> ProductionStage {
        self.production_stage
    }

    pub fn production_notes(&self) -> &str {
        &self.production_notes
    }

    pub fn dispatches(&self) -> &[DispatchRecord] {
        &self.dispatches
    }

    /// Returns a dispatch record by id.
    pub fn dispatch(&self, dispatch_id: DispatchId) -> Option<&DispatchRecord> {
        self.dispatches.iter().find(|d| d.id == dispatch_id)
    }

    pub fn dispatch_status(&self) -> DispatchStatus {
        self.dispatch_status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns true if any line carries the given normalized name.
    pub fn has_product(&self, normalized_name: &str) -> bool {
        self.products.iter().any(|l| l.matches(normalized_name))
    }

    /// Units of the named product still to be produced.
    pub fn pending_units(&self, normalized_name: &str) -> u32 {
        self.products
            .iter()
            .filter(|l| l.matches(normalized_name))
            .map(LineItem::pending)
            .sum()
    }

    /// Units sent so far for one line.
    pub fn sent_for_line(&self, line_id: LineItemId) -> u64 {
        self.dispatches
            .iter()
            .flat_map(|d| &d.items)
            .filter(|i| i.line_item_id == line_id)
            .map(|i| u64::from(i.quantity_sent))
            .sum()
    }

    /// Units that can still go out for one line: what has been produced and
    /// is still owed to the customer.
    pub fn dispatchable_for_line(&self, line: &LineItem) -> u32 {
        let already_sent = self.sent_for_line(line.id);
        let max_dispatchable = u64::from(line.produced).saturating_sub(already_sent);
        let demand_remaining = u64::from(line.quantity).saturating_sub(already_sent);
        // Both bounds are at most a u32 value.
        u32::try_from(max_dispatchable.min(demand_remaining)).unwrap_or(0)
    }

    /// Returns true if the delivery day, in the business time zone, is
    /// before `today`.
    pub fn is_overdue(&self, tz: Tz, today: chrono::NaiveDate) -> bool {
        self.delivery_date.with_timezone(&tz).date_naive() < today
    }
}

// Production
impl Order {
    /// Distributes up to `available` produced units of a product across the
    /// matching lines, in line order, and returns how many were taken.
    pub fn allocate_production(&mut self, normalized_name: &str, available: u32) -> u32 {
        let mut remaining = available;
        for line in self
            .products
            .iter_mut()
            .filter(|l| l.matches(normalized_name))
        {
            if remaining == 0 {
                break;
            }
            remaining -= line.produce(remaining);
        }

        let distributed = available - remaining;
        if distributed > 0 {
            self.refresh_production_stage();
        }
        distributed
    }

    /// Recomputes the production stage after line progress changed.
    ///
    /// `FINISHED` once every line is done; a `PENDING` order with any
    /// progress moves to `IN_PROCESS`; otherwise the stage is kept.
    pub fn refresh_production_stage(&mut self) {
        if self.products.iter().all(LineItem::is_done) {
            self.production_stage = ProductionStage::Finished;
        } else if self.production_stage == ProductionStage::Pending
            && self
                .products
                .iter()
                .any(|l| l.produced > 0 || l.production_status != LineProductionStatus::Pending)
        {
            self.production_stage = ProductionStage::InProcess;
        }
    }

    /// Flips an active order whose delivery day has passed to `DELAYED`.
    ///
    /// Returns true if the stage changed.
    pub fn mark_delayed_if_overdue(&mut self, tz: Tz, today: chrono::NaiveDate) -> bool {
        let flips = matches!(
            self.production_stage,
            ProductionStage::Pending | ProductionStage::InProcess
        );
        if flips && self.is_overdue(tz, today) {
            self.production_stage = ProductionStage::Delayed;
            return true;
        }
        false
    }

    /// Overrides the production stage. Finishing an order completes every line.
    pub fn set_production_stage(&mut self, stage: ProductionStage) -> Result<(), OrderError> {
        if !stage.is_manually_settable() {
            return Err(OrderError::InvalidStage(stage.to_string()));
        }
        if stage == ProductionStage::Finished {
            for line in &mut self.products {
                line.set_status(LineProductionStatus::Completed);
            }
        }
        self.production_stage = stage;
        Ok(())
    }

    pub fn set_production_notes(&mut self, notes: impl Into<String>) {
        self.production_notes = notes.into();
    }

    /// Sets the production flag (and optionally the notes) of one line.
    pub fn set_line_status(
        &mut self,
        line_id: LineItemId,
        status: LineProductionStatus,
        notes: Option<String>,
    ) -> Result<(), OrderError> {
        let line = self
            .products
            .iter_mut()
            .find(|l| l.id == line_id)
            .ok_or(OrderError::LineItemNotFound(line_id))?;

        line.set_status(status);
        if let Some(notes) = notes {
            line.production_notes = Some(notes);
        }
        self.refresh_production_stage();
        Ok(())
    }
}

// Dispatch
impl Order {
    fn check_dispatch_items(&self, items: &[DispatchItem]) -> Result<(), OrderError> {
        if items.is_empty() {
            return Err(OrderError::validation("A dispatch needs at least one item"));
        }
        for item in items {
            if self.line(item.line_item_id).is_none() {
                return Err(OrderError::LineItemNotFound(item.line_item_id));
            }
        }
        Ok(())
    }

    /// Fills in missing name snapshots from the referenced lines.
    fn snapshot_names(&self, items: &mut [DispatchItem]) {
        for item in items.iter_mut().filter(|i| i.name.trim().is_empty()) {
            if let Some(line) = self.line(item.line_item_id) {
                item.name = line.name.clone();
            }
        }
    }

    fn refresh_dispatch_status(&mut self) {
        self.dispatch_status = derive_dispatch_status(&self.products, &self.dispatches);
    }

    /// Appends a caller-supplied dispatch record.
    ///
    /// Quantities are taken as reported: neither production nor the ordered
    /// amount caps them.
    pub fn add_dispatch(&mut self, mut record: DispatchRecord) -> Result<(), OrderError> {
        if record.destination.trim().is_empty() {
            return Err(OrderError::validation("Dispatch destination is required"));
        }
        self.check_dispatch_items(&record.items)?;
        self.snapshot_names(&mut record.items);

        self.dispatches.push(record);
        self.refresh_dispatch_status();
        Ok(())
    }

    /// Ships up to `available` units of a product to `destination`, one
    /// single-item record per line that can take some.
    ///
    /// Returns how many units were placed.
    pub fn dispatch_product(
        &mut self,
        normalized_name: &str,
        destination: &str,
        available: u32,
        now: DateTime<Utc>,
    ) -> u32 {
        let mut remaining = available;
        let mut records = Vec::new();

        for line in self.products.iter().filter(|l| l.matches(normalized_name)) {
            if remaining == 0 {
                break;
            }
            let take = self.dispatchable_for_line(line).min(remaining);
            if take == 0 {
                continue;
            }
            remaining -= take;
            records.push(DispatchRecord::new(
                destination,
                vec![DispatchItem {
                    line_item_id: line.id,
                    name: line.name.clone(),
                    quantity_sent: take,
                }],
                Some(AUTO_DISPATCH_NOTE.to_string()),
                AUTO_DISPATCH_REPORTER,
                now,
            ));
        }

        if !records.is_empty() {
            self.dispatches.extend(records);
            self.refresh_dispatch_status();
        }
        available - remaining
    }

    /// Edits a dispatch record while its edit window is open.
    ///
    /// On `EditWindowExpired` the record is left untouched.
    pub fn edit_dispatch(
        &mut self,
        dispatch_id: DispatchId,
        items: Option<Vec<DispatchItem>>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), OrderError> {
        let record = self
            .dispatch(dispatch_id)
            .ok_or(OrderError::DispatchNotFound(dispatch_id))?;

        if !record.is_editable_at(now) {
            return Err(OrderError::EditWindowExpired {
                dispatch_id,
                reported_at: record.reported_at,
            });
        }

        let items = match items {
            Some(mut items) => {
                self.check_dispatch_items(&items)?;
                self.snapshot_names(&mut items);
                Some(items)
            }
            None => None,
        };

        if let Some(record) = self.dispatches.iter_mut().find(|d| d.id == dispatch_id) {
            if let Some(items) = items {
                record.items = items;
            }
            if let Some(notes) = notes {
                record.notes = Some(notes);
            }
            record.modified_at = now;
        }
        self.refresh_dispatch_status();
        Ok(())
    }
}

// Billing
impl Order {
    /// Changes the invoice request. Not allowed once the invoice is issued.
    ///
    /// Needing an invoice (re)queues it as `PENDING`, so a failed one is
    /// retried; not needing one clears the status.
    pub fn update_invoice_request(
        &mut self,
        invoice_needed: Option<bool>,
        invoice_data: Option<InvoiceData>,
    ) -> Result<(), OrderError> {
        if self.invoice_status == Some(SyncStatus::Processed) {
            return Err(OrderError::InvoiceAlreadyProcessed(self.id));
        }

        if let Some(needed) = invoice_needed {
            self.invoice_needed = needed;
        }
        if let Some(data) = invoice_data {
            self.invoice_data = Some(data);
        }

        if self.invoice_needed {
            self.invoice_status = Some(SyncStatus::Pending);
            self.invoice_error = None;
        } else {
            self.invoice_status = None;
        }
        Ok(())
    }

    /// Records a successfully issued invoice.
    pub fn mark_invoice_processed(&mut self, info: serde_json::Value) {
        self.invoice_status = Some(SyncStatus::Processed);
        self.invoice_info = Some(info);
        self.invoice_error = None;
    }

    /// Records a failed invoice attempt.
    pub fn mark_invoice_failed(&mut self, error: impl Into<String>) {
        self.invoice_status = Some(SyncStatus::Error);
        self.invoice_error = Some(error.into());
    }

    /// Stores collected payment details, pending sync with accounting.
    ///
    /// Requires an issued invoice to collect against.
    pub fn record_payment(&mut self, details: PaymentDetails) -> Result<(), OrderError> {
        if self.invoice_status != Some(SyncStatus::Processed) {
            return Err(OrderError::validation(
                "Payment can only be collected on a processed invoice",
            ));
        }
        if details.amount.is_negative() || details.amount.is_zero() {
            return Err(OrderError::validation("Payment amount must be positive"));
        }
        self.payment_details = Some(details);
        self.collection_status = Some(SyncStatus::Pending);
        self.collection_error = None;
        Ok(())
    }

    pub fn mark_collection_processed(&mut self) {
        self.collection_status = Some(SyncStatus::Processed);
        self.collection_error = None;
    }

    pub fn mark_collection_failed(&mut self, error: impl Into<String>) {
        self.collection_status = Some(SyncStatus::Error);
        self.collection_error = Some(error.into());
    }
}

// Persistence
impl Order {
    /// Stamps the order as written at `now`.
    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    pub(crate) fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    /// Builds the stored document, extracting the indexed columns.
    pub fn to_document(&self) -> Result<OrderDocument, serde_json::Error> {
        let mut product_names: Vec<String> =
            self.products.iter().map(|l| normalize_name(&l.name)).collect();
        product_names.sort();
        product_names.dedup();

        Ok(OrderDocument {
            id: self.id,
            version: self.version,
            delivery_date: self.delivery_date,
            production_stage: self.production_stage.as_str().to_string(),
            dispatch_status: self.dispatch_status.as_str().to_string(),
            delivery_type: self.delivery_type.as_str().to_string(),
            branch: self.branch.map(|b| b.as_str().to_string()),
            product_names,
            invoice_needed: self.invoice_needed,
            invoice_status: self.invoice_status.map(|s| s.as_str().to_string()),
            created_at: self.created_at,
            updated_at: self.updated_at,
            body: serde_json::to_value(self)?,
        })
    }

    /// Rebuilds the aggregate from a stored document.
    pub fn from_document(document: &OrderDocument) -> Result<Order, serde_json::Error> {
        let mut order: Order = document.decode()?;
        order.version = document.version;
        Ok(order)
    }
}

// Customer confirmation
impl Order {
    /// Renders the confirmation message sent to the customer over chat.
    pub fn confirmation_message(&self, business_name: &str, tz: Tz) -> String {
        let branch = self.branch.map(|b| b.as_str()).unwrap_or("S/N");
        let order_type = match self.delivery_type {
            DeliveryType::Pickup => format!("Retiro en local - {branch}"),
            DeliveryType::Delivery => format!("Delivery saliendo de - {branch}"),
        };
        let invoice = self.invoice_data.as_ref();
        let ruc = invoice.map(|d| d.ruc.as_str()).filter(|s| !s.is_empty());
        let email = invoice.map(|d| d.email.as_str()).filter(|s| !s.is_empty());
        let items = self
            .products
            .iter()
            .map(|l| format!("{} x {}", l.quantity, l.name))
            .collect::<Vec<_>>()
            .join("\n");
        let address = match self.delivery_type {
            DeliveryType::Delivery => self.delivery_address.as_deref().unwrap_or("N/A"),
            DeliveryType::Pickup => "N/A (Retiro)",
        };

        format!(
            "CONFIRMACIÓN DE PEDIDO - {business}\n\n\
             Tipo de Orden: {order_type}\n\n\
             Cliente: {customer}\n\n\
             Cédula/RUC: {ruc}\n\n\
             Correo: {email}\n\n\
             Celular: {phone}\n\n\
             Fecha de Entrega: {date}\n\n\
             Hora de Entrega/Retiro: {time}\n\n\
             Items:\n\n{items}\n\n\
             Dirección de Entrega: {address}\n\n\
             Link Maps: {maps}",
            business = business_name.to_uppercase(),
            customer = self.customer_name,
            ruc = ruc.unwrap_or("N/A"),
            email = email.unwrap_or("N/A"),
            phone = self.customer_phone.as_deref().unwrap_or("N/A"),
            date = self.delivery_date.with_timezone(&tz).format("%d/%m/%Y"),
            time = self.delivery_time,
            maps = self.google_maps_link.as_deref().unwrap_or("N/A"),
        )
    }
}
