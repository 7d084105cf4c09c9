//! In-memory accounting service for tests and runs without credentials.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{Value, json};
use tokio::sync::RwLock;

use crate::client::{AccountingService, DocumentFilter, Person, ProductFilter};
use crate::error::{AccountingError, Result};
use crate::invoice::{CollectionPayload, InvoicePayload};

#[derive(Debug, Default)]
struct State {
    invoices: Vec<InvoicePayload>,
    collections: Vec<(String, CollectionPayload)>,
    persons: Vec<Person>,
    products: Vec<Value>,
    documents: Vec<Value>,
    next_id: u32,
    fail_on_invoice: bool,
    fail_on_collection: bool,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}-{:04}", self.next_id)
    }
}

/// Accounting service that keeps everything in memory.
///
/// Issued invoices show up in `list_documents`, so analytics sync works
/// against it end to end.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAccountingService {
    state: Arc<RwLock<State>>,
}

impl InMemoryAccountingService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following invoice request fail.
    pub async fn set_fail_on_invoice(&self, fail: bool) {
        self.state.write().await.fail_on_invoice = fail;
    }

    /// Makes every following collection request fail.
    pub async fn set_fail_on_collection(&self, fail: bool) {
        self.state.write().await.fail_on_collection = fail;
    }

    pub async fn add_product(&self, product: Value) {
        self.state.write().await.products.push(product);
    }

    /// Adds an already issued document.
    pub async fn add_document(&self, document: Value) {
        self.state.write().await.documents.push(document);
    }

    pub async fn invoices(&self) -> Vec<InvoicePayload> {
        self.state.read().await.invoices.clone()
    }

    pub async fn collections(&self) -> Vec<(String, CollectionPayload)> {
        self.state.read().await.collections.clone()
    }
}

fn document_matches(filter: &DocumentFilter, document: &Value) -> bool {
    let issued = document
        .get("fecha_emision")
        .and_then(Value::as_str)
        .and_then(|d| NaiveDate::parse_from_str(d, "%d/%m/%Y").ok());

    if filter.has_dates() {
        let Some(issued) = issued else {
            return false;
        };
        if filter.issued_on.is_some_and(|d| d != issued)
            || filter.from.is_some_and(|d| issued < d)
            || filter.to.is_some_and(|d| issued > d)
        {
            return false;
        }
    }
    match filter.document_type {
        Some(ref kind) => document.get("tipo_documento").and_then(Value::as_str) == Some(kind.as_str()),
        None => true,
    }
}

#[async_trait]
impl AccountingService for InMemoryAccountingService {
    async fn create_invoice(&self, invoice: &InvoicePayload) -> Result<Value> {
        let mut state = self.state.write().await;
        if state.fail_on_invoice {
            return Err(AccountingError::Api {
                status: 400,
                message: "Invoice rejected".to_string(),
            });
        }

        let id = state.next_id("DOC");
        let document = json!({
            "id": id,
            "documento": invoice.documento,
            "tipo_documento": invoice.tipo_documento,
            "fecha_emision": invoice.fecha_emision,
            "total": format!("{:.2}", invoice.total),
        });
        state.invoices.push(invoice.clone());
        state.documents.push(document.clone());
        Ok(document)
    }

    async fn register_collection(
        &self,
        document_id: &str,
        collection: &CollectionPayload,
    ) -> Result<Value> {
        let mut state = self.state.write().await;
        if state.fail_on_collection {
            return Err(AccountingError::Api {
                status: 400,
                message: "Collection rejected".to_string(),
            });
        }
        let exists = state
            .documents
            .iter()
            .any(|d| d.get("id").and_then(Value::as_str) == Some(document_id));
        if !exists {
            return Err(AccountingError::Api {
                status: 404,
                message: format!("Document {document_id} not found"),
            });
        }

        let id = state.next_id("COB");
        state
            .collections
            .push((document_id.to_string(), collection.clone()));
        Ok(json!({ "id": id, "documento_id": document_id, "monto": collection.monto }))
    }

    async fn find_persons(&self, query: &str) -> Result<Vec<Person>> {
        let query = query.trim().to_lowercase();
        let state = self.state.read().await;
        Ok(state
            .persons
            .iter()
            .filter(|p| p.ruc == query || p.razon_social.to_lowercase().contains(&query))
            .cloned()
            .collect())
    }

    async fn create_person(&self, person: &Person) -> Result<Person> {
        person.validate()?;
        let mut state = self.state.write().await;
        let mut created = person.clone();
        created.id = Some(state.next_id("PER"));
        state.persons.push(created.clone());
        Ok(created)
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Value>> {
        let needle = filter.filter.as_deref().map(str::to_lowercase);
        let state = self.state.read().await;
        Ok(state
            .products
            .iter()
            .filter(|p| match needle {
                Some(ref needle) => p
                    .get("nombre")
                    .and_then(Value::as_str)
                    .is_some_and(|n| n.to_lowercase().contains(needle)),
                None => true,
            })
            .cloned()
            .collect())
    }

    async fn list_documents(&self, filter: &DocumentFilter) -> Result<Vec<Value>> {
        let state = self.state.read().await;
        Ok(state
            .documents
            .iter()
            .filter(|d| document_matches(filter, d))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    use crate::client::document_total;
    use crate::invoice::format_date;

    fn invoice(cents: i64, day: NaiveDate) -> InvoicePayload {
        let total = Decimal::new(cents, 2);
        InvoicePayload {
            pos: "pos".to_string(),
            fecha_emision: format_date(day),
            tipo_documento: "FAC",
            documento: "001-001-000000001".to_string(),
            estado: "P",
            electronico: true,
            autorizacion: String::new(),
            cliente: crate::invoice::InvoiceCustomer {
                razon_social: "Ana".to_string(),
                ruc: "0912345678".to_string(),
                cedula: "0912345678".to_string(),
                email: String::new(),
                direccion: String::new(),
                tipo: "C",
                telefonos: String::new(),
            },
            detalles: Vec::new(),
            subtotal_0: Decimal::ZERO,
            subtotal_12: Decimal::ZERO,
            subtotal_15: total,
            iva: Decimal::ZERO,
            ice: Decimal::ZERO,
            total,
            servicio: Decimal::ZERO,
            propina: Decimal::ZERO,
            metodo_pago: "TRA",
        }
    }

    #[tokio::test]
    async fn issued_invoices_are_listed_by_day() {
        let service = InMemoryAccountingService::new();
        let monday = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        let tuesday = monday.succ_opt().unwrap();

        let created = service.create_invoice(&invoice(1150, monday)).await.unwrap();
        assert_eq!(created["id"], "DOC-0001");
        service.create_invoice(&invoice(300, tuesday)).await.unwrap();

        let docs = service
            .list_documents(&DocumentFilter::issued_on(monday))
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(document_total(&docs[0]).cents(), 1150);

        let all = service
            .list_documents(&DocumentFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn collection_needs_known_document() {
        let service = InMemoryAccountingService::new();
        let payment = CollectionPayload {
            forma_cobro: "EF".to_string(),
            monto: Decimal::new(500, 2),
            fecha: "09/03/2026".to_string(),
            numero_comprobante: None,
            cuenta_bancaria_id: None,
            tipo_ping: None,
            numero_tarjeta: None,
        };

        let result = service.register_collection("DOC-9999", &payment).await;
        assert!(matches!(result, Err(AccountingError::Api { status: 404, .. })));

        let day = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        service.create_invoice(&invoice(500, day)).await.unwrap();
        service
            .register_collection("DOC-0001", &payment)
            .await
            .unwrap();
        assert_eq!(service.collections().await.len(), 1);
    }

    #[tokio::test]
    async fn failure_switch() {
        let service = InMemoryAccountingService::new();
        service.set_fail_on_invoice(true).await;
        let day = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();

        assert!(service.create_invoice(&invoice(100, day)).await.is_err());
        assert!(service.invoices().await.is_empty());
    }
}
