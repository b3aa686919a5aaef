//! Prices stored in minor currency units.
//!
//! The store backend transmits a price as `{ "units": 1050, "currency": 1 }`,
//! where `units` is the amount in the smallest currency unit (stotinki for
//! BGN) and `currency` is a numeric code. Only one currency code is known;
//! every other code renders with a placeholder symbol.
//!
//! Amounts are read and written as decimals in major units: minor units are
//! always printed with two digits (1005 is `10,05`, never `10,5`), and a bare
//! integer typed into a form is whole major units (`"10"` is 1000 minor
//! units), so a formatted amount parses back to the same price.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minor units per major unit.
const MINOR_PER_MAJOR: i64 = 100;

/// Errors produced by price parsing and arithmetic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    /// The input is not a decimal amount like `10,50`.
    #[error("invalid price: {0}")]
    InvalidAmount(String),

    /// Prices in different currencies were combined.
    #[error("cannot combine prices in currencies {0} and {1}")]
    CurrencyMismatch(i32, i32),

    /// The result does not fit in 64 bits.
    #[error("price overflow")]
    Overflow,
}

/// Currency of a price, carried as a numeric code on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum Currency {
    /// Bulgarian lev, code 1.
    Bgn,
    /// Any code the storefront has no symbol for.
    Other(i32),
}

impl Currency {
    /// Numeric wire code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Bgn => 1,
            Self::Other(code) => code,
        }
    }

    /// Display symbol, `-` for unknown codes.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Bgn => "BGN",
            Self::Other(_) => "-",
        }
    }
}

impl Default for Currency {
    /// Zero is what the backend omits, so an absent currency decodes to it.
    fn default() -> Self {
        Self::Other(0)
    }
}

impl From<i32> for Currency {
    fn from(code: i32) -> Self {
        match code {
            1 => Self::Bgn,
            other => Self::Other(other),
        }
    }
}

impl From<Currency> for i32 {
    fn from(currency: Currency) -> Self {
        currency.code()
    }
}

/// A price in minor units with its currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Price {
    /// Amount in minor units (e.g. 1050 for 10,50).
    pub units: i64,
    /// Currency code.
    pub currency: Currency,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(units: i64, currency: Currency) -> Self {
        Self { units, currency }
    }

    /// Create a BGN price from minor units.
    #[must_use]
    pub const fn bgn(units: i64) -> Self {
        Self::new(units, Currency::Bgn)
    }

    /// Whole major units (`units / 100`).
    #[must_use]
    pub const fn major(&self) -> i64 {
        self.units / MINOR_PER_MAJOR
    }

    /// Remaining minor units (`units % 100`).
    #[must_use]
    pub const fn minor(&self) -> i64 {
        self.units % MINOR_PER_MAJOR
    }

    /// Amount without the currency symbol, e.g. `10,50`.
    ///
    /// This is the format the edit forms are pre-filled with.
    #[must_use]
    pub fn amount_string(&self) -> String {
        let sign = if self.units < 0 { "-" } else { "" };
        format!("{sign}{},{:02}", self.major().abs(), self.minor().abs())
    }

    /// Parse a user-entered amount into a price.
    ///
    /// Accepts a comma or a dot as the decimal separator and at most two
    /// fractional digits: `"10,50"`, `"10.5"` and `"10"` are all valid, and
    /// `"10,5"` means ten and fifty.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::InvalidAmount` for empty, negative or malformed
    /// input and `PriceError::Overflow` when the amount does not fit.
    pub fn parse_amount(input: &str, currency: Currency) -> Result<Self, PriceError> {
        let trimmed = input.trim();
        let invalid = || PriceError::InvalidAmount(input.to_string());

        let (major, minor) = match trimmed.split_once([',', '.']) {
            Some((major, minor)) => (major, minor),
            None => (trimmed, ""),
        };

        if major.is_empty()
            || minor.len() > 2
            || !major.bytes().all(|b| b.is_ascii_digit())
            || !minor.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let major: i64 = major.parse().map_err(|_| PriceError::Overflow)?;
        let minor: i64 = match minor.len() {
            0 => 0,
            1 => minor.parse::<i64>().map_err(|_| invalid())? * 10,
            _ => minor.parse().map_err(|_| invalid())?,
        };

        major
            .checked_mul(MINOR_PER_MAJOR)
            .and_then(|units| units.checked_add(minor))
            .map(|units| Self::new(units, currency))
            .ok_or(PriceError::Overflow)
    }

    /// Add two prices of the same currency.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::CurrencyMismatch` if the currencies differ.
    pub fn checked_add(self, other: Self) -> Result<Self, PriceError> {
        if self.currency != other.currency {
            return Err(PriceError::CurrencyMismatch(
                self.currency.code(),
                other.currency.code(),
            ));
        }
        self.units
            .checked_add(other.units)
            .map(|units| Self::new(units, self.currency))
            .ok_or(PriceError::Overflow)
    }

    /// Multiply by an item quantity.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Overflow` if the product does not fit.
    pub fn times(self, quantity: i64) -> Result<Self, PriceError> {
        self.units
            .checked_mul(quantity)
            .map(|units| Self::new(units, self.currency))
            .ok_or(PriceError::Overflow)
    }
}

impl fmt::Display for Price {
    /// Formats as `10,50 BGN`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount_string(), self.currency.symbol())
    }
}
