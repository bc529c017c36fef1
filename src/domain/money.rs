use crate::error::PaymentError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A positive monetary amount with at most two decimal places.
///
/// Transactions always store their amount unsigned; direction is applied
/// only when a ledger entry is built.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, PaymentError> {
        if value <= Decimal::ZERO {
            return Err(PaymentError::ValidationError(
                "Amount must be positive".to_string(),
            ));
        }
        // Trailing zeros are fine (`12.500`); sub-cent precision is not.
        if value.normalize().scale() > 2 {
            return Err(PaymentError::ValidationError(
                "Amount must have at most two decimal places".to_string(),
            ));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Two-decimal rendering used on provider wires, e.g. `50.00`.
    pub fn to_wire(&self) -> String {
        format!("{:.2}", self.0)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = PaymentError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
