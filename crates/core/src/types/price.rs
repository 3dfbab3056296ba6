//! Price representation and currency formatting.
//!
//! The backend reports every amount as an integer count of the currency's
//! minor unit (`1999` USD is $19.99, `1999` JPY is ¥1,999) together with a
//! lowercase ISO 4217 code. Formatting here is display-only: totals,
//! discounts and taxes are always taken verbatim from the backend.

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Build a price from a backend minor-unit amount.
    #[must_use]
    pub fn from_minor_units(minor: i64, currency_code: CurrencyCode) -> Self {
        Self::new(
            Decimal::new(minor, currency_code.minor_digits()),
            currency_code,
        )
    }

    /// Format for display, e.g. `$1,299.00` or `-€5.00`.
    #[must_use]
    pub fn display(&self) -> String {
        let sign = if self.amount.is_sign_negative() && !self.amount.is_zero() {
            "-"
        } else {
            ""
        };
        let digits = group_thousands(self.amount.abs(), self.currency_code.minor_digits());
        format!("{sign}{}{digits}", self.currency_code.symbol())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// ISO 4217 currency codes the storefront formats natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
    JPY,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::USD => "$",
            Self::CAD => "CA$",
            Self::AUD => "A$",
            Self::EUR => "€",
            Self::GBP => "£",
            Self::JPY => "¥",
        }
    }

    /// Number of minor-unit digits.
    #[must_use]
    pub const fn minor_digits(self) -> u32 {
        match self {
            Self::JPY => 0,
            _ => 2,
        }
    }

    /// Uppercase ISO code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
            Self::JPY => "JPY",
        }
    }
}

impl FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            "GBP" => Ok(Self::GBP),
            "CAD" => Ok(Self::CAD),
            "AUD" => Ok(Self::AUD),
            "JPY" => Ok(Self::JPY),
            _ => Err(format!("unsupported currency: {s}")),
        }
    }
}

/// Format a backend minor-unit amount for display.
///
/// Unknown currency codes fall back to two decimals followed by the
/// uppercased code, e.g. `12.50 CHF`.
#[must_use]
pub fn format_amount(minor: i64, currency_code: &str) -> String {
    currency_code.parse::<CurrencyCode>().map_or_else(
        |_| {
            let amount = Decimal::new(minor, 2);
            let sign = if minor < 0 { "-" } else { "" };
            format!(
                "{sign}{} {}",
                group_thousands(amount.abs(), 2),
                currency_code.to_ascii_uppercase()
            )
        },
        |code| Price::from_minor_units(minor, code).display(),
    )
}

fn group_thousands(amount: Decimal, digits: u32) -> String {
    let rendered = format!("{:.*}", digits as usize, amount);
    let (whole, fraction) = rendered
        .split_once('.')
        .map_or((rendered.as_str(), None), |(w, f)| (w, Some(f)));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match fraction {
        Some(fraction) => format!("{grouped}.{fraction}"),
        None => grouped,
    }
}
