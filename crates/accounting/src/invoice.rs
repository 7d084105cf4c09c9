//! Invoice and collection payloads in the accounting API's format.

use chrono::NaiveDate;
use domain::{Money, Order, PaymentDetails};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::{AccountingError, Result};

/// Settings applied to every invoice.
#[derive(Debug, Clone)]
pub struct InvoiceSettings {
    pub pos_token: String,
    pub fallback_product_id: String,
    pub vat_percent: u32,
    pub document_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoicePayload {
    pub pos: String,
    pub fecha_emision: String,
    pub tipo_documento: &'static str,
    pub documento: String,
    pub estado: &'static str,
    pub electronico: bool,
    pub autorizacion: String,
    pub cliente: InvoiceCustomer,
    pub detalles: Vec<InvoiceLine>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal_0: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal_12: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal_15: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub iva: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub ice: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub servicio: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub propina: Decimal,
    pub metodo_pago: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceCustomer {
    pub razon_social: String,
    pub ruc: String,
    /// Filled only when the id is a 10-digit national id.
    pub cedula: String,
    pub email: String,
    pub direccion: String,
    pub tipo: &'static str,
    pub telefonos: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvoiceLine {
    pub producto_id: String,
    pub cantidad: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub precio: Decimal,
    pub descripcion: String,
    pub porcentaje_iva: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub base_cero: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub base_gravable: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub base_no_gravable: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub porcentaje_descuento: Decimal,
}

/// A payment registered against an issued document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollectionPayload {
    pub forma_cobro: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub monto: Decimal,
    pub fecha: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numero_comprobante: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuenta_bancaria_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo_ping: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub numero_tarjeta: Option<String>,
}

/// Formats a date the way the accounting API expects it: `DD/MM/YYYY`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

fn decimal(amount: Money) -> Decimal {
    amount.to_decimal()
}

/// Document number: the configured prefix plus nine digits derived from the
/// order id, so re-sending the same order reuses its number.
fn document_number(order: &Order, prefix: &str) -> String {
    let seq = order.id().as_uuid().as_u128() % 1_000_000_000;
    format!("{prefix}{seq:09}")
}

impl InvoicePayload {
    /// Builds the invoice for an order.
    ///
    /// Every line is taxed at the configured VAT rate.
    pub fn for_order(
        order: &Order,
        settings: &InvoiceSettings,
        issued_on: NaiveDate,
    ) -> Result<InvoicePayload> {
        let data = order
            .invoice_data()
            .filter(|d| !d.ruc.trim().is_empty() && !d.business_name.trim().is_empty())
            .ok_or_else(|| {
                AccountingError::Validation(format!(
                    "Order {} has no invoice data (ruc and business name)",
                    order.id()
                ))
            })?;

        let vat = settings.vat_percent;
        let mut taxed = Money::zero();
        let mut untaxed = Money::zero();
        let mut total_vat = Money::zero();

        let detalles = order
            .products()
            .iter()
            .map(|line| {
                let line_total = line.line_total();
                let (base_cero, base_gravable) = if vat > 0 {
                    taxed += line_total;
                    total_vat += line_total.percent(vat);
                    (Money::zero(), line_total)
                } else {
                    untaxed += line_total;
                    (line_total, Money::zero())
                };

                InvoiceLine {
                    producto_id: line
                        .accounting_product_id
                        .clone()
                        .unwrap_or_else(|| settings.fallback_product_id.clone()),
                    cantidad: line.quantity,
                    precio: decimal(line.price),
                    descripcion: line.name.clone(),
                    porcentaje_iva: vat,
                    base_cero: decimal(base_cero),
                    base_gravable: decimal(base_gravable),
                    base_no_gravable: Decimal::ZERO,
                    porcentaje_descuento: Decimal::ZERO,
                }
            })
            .collect();

        let ruc = data.ruc.trim().to_string();
        let cedula = if ruc.len() == 10 { ruc.clone() } else { String::new() };

        Ok(InvoicePayload {
            pos: settings.pos_token.clone(),
            fecha_emision: format_date(issued_on),
            tipo_documento: "FAC",
            documento: document_number(order, &settings.document_prefix),
            estado: "P",
            electronico: true,
            autorizacion: String::new(),
            cliente: InvoiceCustomer {
                razon_social: data.business_name.clone(),
                ruc,
                cedula,
                email: data.email.clone(),
                direccion: data.address.clone(),
                tipo: "C",
                telefonos: order.customer_phone().unwrap_or_default().to_string(),
            },
            detalles,
            subtotal_0: decimal(untaxed),
            subtotal_12: Decimal::ZERO,
            subtotal_15: decimal(taxed),
            iva: decimal(total_vat),
            ice: Decimal::ZERO,
            total: decimal(untaxed + taxed + total_vat),
            servicio: Decimal::ZERO,
            propina: Decimal::ZERO,
            metodo_pago: "TRA",
        })
    }
}

impl CollectionPayload {
    pub fn from_payment(details: &PaymentDetails) -> CollectionPayload {
        CollectionPayload {
            forma_cobro: details.method.clone(),
            monto: decimal(details.amount),
            fecha: format_date(details.date),
            numero_comprobante: details.receipt_number.clone(),
            cuenta_bancaria_id: details.bank_account_id.clone(),
            tipo_ping: details.card_type.clone(),
            numero_tarjeta: details.card_number.clone(),
        }
    }
}
