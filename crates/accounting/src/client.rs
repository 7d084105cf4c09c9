//! The accounting service seam and the records it exchanges.

use async_trait::async_trait;
use chrono::NaiveDate;
use domain::Money;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AccountingError, Result};
use crate::invoice::{CollectionPayload, InvoicePayload, format_date};

/// Operations the backend needs from the accounting service.
#[async_trait]
pub trait AccountingService: Send + Sync {
    /// Issues an invoice and returns the created document as reported by
    /// the service.
    async fn create_invoice(&self, invoice: &InvoicePayload) -> Result<Value>;

    /// Registers a payment against an issued document.
    async fn register_collection(
        &self,
        document_id: &str,
        collection: &CollectionPayload,
    ) -> Result<Value>;

    /// Looks people up by id number or name.
    async fn find_persons(&self, query: &str) -> Result<Vec<Person>>;

    async fn create_person(&self, person: &Person) -> Result<Person>;

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Value>>;

    /// Lists issued documents. Each one carries at least `total`.
    async fn list_documents(&self, filter: &DocumentFilter) -> Result<Vec<Value>>;
}

/// A customer or supplier record in the accounting service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Person {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub razon_social: String,
    /// Tax id; also used for the national id before mapping.
    #[serde(default)]
    pub ruc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cedula: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub direccion: String,
    #[serde(default)]
    pub telefonos: String,
    /// `N` natural, `J` legal entity, `I` no id, `P` plate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tipo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub es_cliente: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nombre_comercial: Option<String>,
}

impl Person {
    /// Checks the fields an invoice needs.
    pub fn validate(&self) -> Result<()> {
        let missing = [
            &self.ruc,
            &self.razon_social,
            &self.email,
            &self.direccion,
            &self.telefonos,
        ]
        .iter()
        .any(|value| value.trim().is_empty());

        if missing {
            return Err(AccountingError::Validation(
                "Missing required fields for Invoice. Required: ruc, razon_social, email, direccion, telefonos."
                    .to_string(),
            ));
        }
        Ok(())
    }
}

/// Product search parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductFilter {
    /// Free-text search.
    #[serde(default, alias = "query", alias = "filtro")]
    pub filter: Option<String>,
    #[serde(default, alias = "codigo_barra")]
    pub barcode: Option<String>,
    #[serde(default, alias = "categoria_id")]
    pub category_id: Option<String>,
}

impl ProductFilter {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(ref v) = self.filter {
            params.push(("filtro", v.clone()));
        }
        if let Some(ref v) = self.barcode {
            params.push(("codigo_barra", v.clone()));
        }
        if let Some(ref v) = self.category_id {
            params.push(("categoria_id", v.clone()));
        }
        params
    }
}

/// Document search parameters. Dates go out as `DD/MM/YYYY`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFilter {
    pub issued_on: Option<NaiveDate>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub document_type: Option<String>,
    pub person_id: Option<String>,
}

impl DocumentFilter {
    /// Documents issued on one day.
    pub fn issued_on(date: NaiveDate) -> Self {
        Self {
            issued_on: Some(date),
            ..Self::default()
        }
    }

    /// Documents issued within an inclusive range.
    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
            ..Self::default()
        }
    }

    pub fn has_dates(&self) -> bool {
        self.issued_on.is_some() || self.from.is_some() || self.to.is_some()
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(date) = self.issued_on {
            params.push(("fecha_emision", format_date(date)));
        }
        if let Some(date) = self.from {
            params.push(("fecha_inicial", format_date(date)));
        }
        if let Some(date) = self.to {
            params.push(("fecha_final", format_date(date)));
        }
        if let Some(ref v) = self.document_type {
            params.push(("tipo", v.clone()));
        }
        if let Some(ref v) = self.person_id {
            params.push(("persona_identificacion", v.clone()));
        }
        params
    }
}

/// Reads a document's `total`, which the service sends as a decimal string
/// or a number. Missing or unreadable totals count as zero.
pub fn document_total(document: &Value) -> Money {
    match document.get("total") {
        Some(Value::String(s)) => Money::parse_decimal(s).unwrap_or_default(),
        Some(Value::Number(n)) => Money::parse_decimal(&n.to_string()).unwrap_or_default(),
        _ => Money::zero(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn totals_from_strings_and_numbers() {
        assert_eq!(
            document_total(&json!({"total": "12.35"})),
            Money::from_cents(1235)
        );
        assert_eq!(document_total(&json!({"total": 7.5})), Money::from_cents(750));
        assert_eq!(document_total(&json!({"total": "1.005"})), Money::from_cents(101));
        assert_eq!(document_total(&json!({"total": 0.285})), Money::from_cents(29));
        assert_eq!(document_total(&json!({"total": "n/a"})), Money::zero());
        assert_eq!(document_total(&json!({})), Money::zero());
    }

    #[test]
    fn document_filter_params() {
        let day = NaiveDate::from_ymd_opt(2026, 2, 3).unwrap();
        assert_eq!(
            DocumentFilter::issued_on(day).params(),
            vec![("fecha_emision", "03/02/2026".to_string())]
        );

        let filter = DocumentFilter {
            document_type: Some("FAC".to_string()),
            ..DocumentFilter::between(day, day.succ_opt().unwrap())
        };
        assert_eq!(
            filter.params(),
            vec![
                ("fecha_inicial", "03/02/2026".to_string()),
                ("fecha_final", "04/02/2026".to_string()),
                ("tipo", "FAC".to_string()),
            ]
        );
    }

    #[test]
    fn person_requires_invoice_fields() {
        let mut person = Person {
            razon_social: "Panadería Sol".to_string(),
            ruc: "0912345678001".to_string(),
            email: "sol@example.com".to_string(),
            direccion: "Urdesa".to_string(),
            telefonos: "042000000".to_string(),
            ..Person::default()
        };
        assert!(person.validate().is_ok());

        person.telefonos = " ".to_string();
        assert!(matches!(
            person.validate(),
            Err(AccountingError::Validation(_))
        ));
    }
}
