//! Value objects for the order domain.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Money amount represented in cents to avoid floating point issues.
///
/// Serialized as a bare integer number of cents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Parses a decimal amount such as `"12.5"`, `"0.99"` or `"1.2e1"`.
    ///
    /// Amounts are rounded half up to the cent, as `percent` does.
    pub fn parse_decimal(s: &str) -> Option<Money> {
        let s = s.trim();
        let value = Decimal::from_str(s)
            .or_else(|_| Decimal::from_scientific(s))
            .ok()?;
        Money::from_decimal(value)
    }

    /// Converts a decimal amount, rounding half up to the cent.
    ///
    /// Returns None when the amount doesn't fit in `i64` cents.
    pub fn from_decimal(value: Decimal) -> Option<Money> {
        let cents = value
            .checked_mul(Decimal::ONE_HUNDRED)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()?;
        Some(Money { cents })
    }

    /// The amount as an exact two-place decimal.
    pub fn to_decimal(&self) -> Decimal {
        Decimal::new(self.cents, 2)
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the dollar portion (whole number).
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            cents: self.cents * quantity as i64,
        }
    }

    /// Returns `percent` percent of this amount, rounded half up to the cent.
    pub fn percent(&self, percent: u32) -> Money {
        let scaled = self.cents * percent as i64;
        let rounded = if scaled >= 0 {
            (scaled + 50) / 100
        } else {
            (scaled - 50) / 100
        };
        Money { cents: rounded }
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-${}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents + rhs.cents,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents += rhs.cents;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

/// Billing identity printed on the invoice.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceData {
    /// Tax id (RUC) or national id (cédula).
    #[serde(default)]
    pub ruc: String,

    #[serde(default)]
    pub business_name: String,

    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub address: String,
}

/// Payment collected for an invoiced order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDetails {
    /// Accounting collection method code (e.g. `EF` cash, `TRA` transfer, `TC` card).
    pub method: String,

    pub amount: Money,

    pub date: NaiveDate,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_account_id: Option<String>,

    /// Card network for card payments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_number: Option<String>,
}
