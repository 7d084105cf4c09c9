use std::time::Duration;

use crate::invoice::InvoiceSettings;

/// Production endpoint of the accounting API.
pub const DEFAULT_BASE_URL: &str = "https://api.contifico.com/sistema/api/v1";

/// Connection and invoicing settings for the accounting service.
#[derive(Debug, Clone)]
pub struct AccountingConfig {
    pub base_url: String,
    pub api_key: String,
    /// Point-of-sale token sent with every invoice.
    pub pos_token: String,
    /// Product id used for lines without a mapped accounting product.
    pub fallback_product_id: String,
    pub vat_percent: u32,
    /// Establishment and emission point, e.g. `001-001-`.
    pub document_prefix: String,
    pub timeout: Duration,
}

impl AccountingConfig {
    /// Returns true when both the API key and POS token are set.
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.pos_token.trim().is_empty()
    }

    pub fn invoice_settings(&self) -> InvoiceSettings {
        InvoiceSettings {
            pos_token: self.pos_token.clone(),
            fallback_product_id: self.fallback_product_id.clone(),
            vat_percent: self.vat_percent,
            document_prefix: self.document_prefix.clone(),
        }
    }
}

impl Default for AccountingConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            pos_token: String::new(),
            fallback_product_id: String::new(),
            vat_percent: 15,
            document_prefix: "001-001-".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}
