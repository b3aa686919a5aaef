//! Order status as transmitted by the store backend.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of an order.
///
/// The backend sends the status as an integer (`1..=4`). Unknown codes are
/// kept rather than rejected so a page can still render the rest of the
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum OrderStatus {
    /// The user's cart. A user has at most one order in this state.
    InCart,
    /// Checked out and being processed.
    InProgress,
    /// Delivered.
    Completed,
    /// Canceled by the user or the store.
    Canceled,
    /// A code this storefront does not know.
    Invalid(i32),
}

impl OrderStatus {
    /// Numeric wire code.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::InCart => 1,
            Self::InProgress => 2,
            Self::Completed => 3,
            Self::Canceled => 4,
            Self::Invalid(code) => code,
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::InCart => "In Cart",
            Self::InProgress => "In Progress",
            Self::Completed => "Completed",
            Self::Canceled => "Canceled",
            Self::Invalid(_) => "Invalid Order Status",
        }
    }

    /// Whether this is the cart.
    #[must_use]
    pub const fn is_cart(self) -> bool {
        matches!(self, Self::InCart)
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        Self::Invalid(0)
    }
}

impl From<i32> for OrderStatus {
    fn from(code: i32) -> Self {
        match code {
            1 => Self::InCart,
            2 => Self::InProgress,
            3 => Self::Completed,
            4 => Self::Canceled,
            other => Self::Invalid(other),
        }
    }
}

impl From<OrderStatus> for i32 {
    fn from(status: OrderStatus) -> Self {
        status.code()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
