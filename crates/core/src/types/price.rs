//! Type-safe price representation using decimal arithmetic.
//!
//! Stripe reports amounts as integers in the currency's minor unit. A
//! [`Price`] converts that to a `Decimal` in the standard unit and renders
//! it the way a browser's `Intl.NumberFormat` would for the locale bound to
//! the currency, so server-rendered pages show the same string a client
//! would produce.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., reais, not centavos).
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

    /// Create a price from an amount in minor units (e.g., `9990` → `99.90`).
    #[must_use]
    pub fn from_minor_units(minor: i64, currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::new(minor, 2), currency_code)
    }

    /// A zero amount in the given currency.
    #[must_use]
    pub const fn zero(currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::ZERO, currency_code)
    }

    /// Format for display using the currency's locale.
    ///
    /// ```rust
    /// # use ignite_shop_core::{CurrencyCode, Price};
    /// let price = Price::from_minor_units(9990, CurrencyCode::BRL);
    /// assert_eq!(price.format(), "R$\u{a0}99,90");
    /// ```
    #[must_use]
    pub fn format(&self) -> String {
        let style = self.currency_code.style();
        let rounded = self.amount.round_dp(2);
        let digits = format!("{:.2}", rounded.abs());
        let (whole, fraction) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

        let number = format!(
            "{}{}{}",
            group_thousands(whole, style.group),
            style.decimal,
            fraction
        );
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
            "-"
        } else {
            ""
        };

        if style.symbol_first {
            format!("{sign}{}{}{number}", style.symbol, style.separator)
        } else {
            format!("{sign}{number}{}{}", style.separator, style.symbol)
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format())
    }
}

/// ISO 4217 currency codes.
///
/// Each currency is bound to the locale the store displays it in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    /// Brazilian real, formatted as `pt-BR`.
    #[default]
    BRL,
    /// US dollar, formatted as `en-US`.
    USD,
    /// Euro, formatted as `de-DE`.
    EUR,
}

impl CurrencyCode {
    /// The ISO 4217 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::BRL => "BRL",
            Self::USD => "USD",
            Self::EUR => "EUR",
        }
    }

    const fn style(self) -> LocaleStyle {
        match self {
            Self::BRL => LocaleStyle {
                symbol: "R$",
                symbol_first: true,
                separator: "\u{a0}",
                group: '.',
                decimal: ',',
            },
            Self::USD => LocaleStyle {
                symbol: "$",
                symbol_first: true,
                separator: "",
                group: ',',
                decimal: '.',
            },
            Self::EUR => LocaleStyle {
                symbol: "€",
                symbol_first: false,
                separator: "\u{a0}",
                group: '.',
                decimal: ',',
            },
        }
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BRL" => Ok(Self::BRL),
            "USD" => Ok(Self::USD),
            "EUR" => Ok(Self::EUR),
            other => Err(format!("unsupported currency: {other}")),
        }
    }
}

/// Separators and symbol placement for one locale.
struct LocaleStyle {
    symbol: &'static str,
    symbol_first: bool,
    separator: &'static str,
    group: char,
    decimal: char,
}

/// Insert `sep` between every group of three digits, counting from the right.
fn group_thousands(digits: &str, sep: char) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(c);
    }
    out
}
