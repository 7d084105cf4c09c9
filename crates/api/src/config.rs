//! Application configuration loaded from environment variables.

use std::time::Duration;

use accounting::AccountingConfig;
use chrono_tz::Tz;
use thiserror::Error;

/// Time zone deciding what "today" means for overdue orders and reports.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::America::Guayaquil;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`: PostgreSQL connection string; orders stay in memory without it
/// - `CORS_ORIGINS`: comma-separated allowed origins; any origin when empty
/// - `BUSINESS_TIMEZONE`: IANA zone name (default: `America/Guayaquil`)
/// - `BUSINESS_NAME`: signs the order confirmation message
/// - `INVOICE_BATCH_SIZE`: invoices issued per batch run (default: `5`)
/// - `ACCOUNTING_*`: see [`Config::accounting_from_env`]
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub cors_origins: Vec<String>,
    pub timezone: Tz,
    pub business_name: String,
    pub invoice_batch_size: usize,
    pub accounting: AccountingConfig,
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match var(name) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(None),
    }
}

/// Splits a comma-separated origin list, dropping blanks.
pub fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults. Set but unparseable values are an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: parse_var("PORT")?.unwrap_or(defaults.port),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: var("DATABASE_URL"),
            cors_origins: var("CORS_ORIGINS")
                .map(|raw| parse_origins(&raw))
                .unwrap_or_default(),
            timezone: parse_var("BUSINESS_TIMEZONE")?.unwrap_or(defaults.timezone),
            business_name: var("BUSINESS_NAME").unwrap_or(defaults.business_name),
            invoice_batch_size: parse_var("INVOICE_BATCH_SIZE")?
                .unwrap_or(defaults.invoice_batch_size),
            accounting: Self::accounting_from_env()?,
        })
    }

    /// Accounting settings from `ACCOUNTING_BASE_URL`, `ACCOUNTING_API_KEY`,
    /// `ACCOUNTING_POS_TOKEN`, `ACCOUNTING_FALLBACK_PRODUCT_ID`,
    /// `ACCOUNTING_VAT_PERCENT`, `ACCOUNTING_DOCUMENT_PREFIX` and
    /// `ACCOUNTING_TIMEOUT_SECS`.
    pub fn accounting_from_env() -> Result<AccountingConfig, ConfigError> {
        let defaults = AccountingConfig::default();
        Ok(AccountingConfig {
            base_url: var("ACCOUNTING_BASE_URL").unwrap_or(defaults.base_url),
            api_key: var("ACCOUNTING_API_KEY").unwrap_or_default(),
            pos_token: var("ACCOUNTING_POS_TOKEN").unwrap_or_default(),
            fallback_product_id: var("ACCOUNTING_FALLBACK_PRODUCT_ID").unwrap_or_default(),
            vat_percent: parse_var("ACCOUNTING_VAT_PERCENT")?.unwrap_or(defaults.vat_percent),
            document_prefix: var("ACCOUNTING_DOCUMENT_PREFIX")
                .unwrap_or(defaults.document_prefix),
            timeout: parse_var("ACCOUNTING_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            cors_origins: Vec::new(),
            timezone: DEFAULT_TIMEZONE,
            business_name: "Dulce Hogar".to_string(),
            invoice_batch_size: accounting::DEFAULT_BATCH_SIZE,
            accounting: AccountingConfig::default(),
        }
    }
}
