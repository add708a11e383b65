//! Fixed-point decimal types for prices and quantities
//!
//! Wraps `rust_decimal::Decimal` so the rest of the system can never mix a
//! price into a quantity slot, and so every comparison and arithmetic step is
//! exact and reproducible across runs. Binary floating point never appears on
//! a matching path.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;
use thiserror::Error;

/// Errors constructing or combining fixed-point values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NumericError {
    #[error("price must be positive, got {0}")]
    NonPositivePrice(Decimal),

    #[error("quantity must not be negative, got {0}")]
    NegativeQuantity(Decimal),

    #[error("not a valid decimal: {0}")]
    Parse(String),
}

/// A limit price. Strictly positive by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Construct from a decimal, rejecting zero and negative values.
    pub fn try_new(value: Decimal) -> Result<Self, NumericError> {
        if value <= Decimal::ZERO {
            return Err(NumericError::NonPositivePrice(value));
        }
        Ok(Self(value))
    }

    /// Construct from a whole number of quote units.
    pub fn from_u64(value: u64) -> Self {
        Self(Decimal::from(value))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// True if this price is an exact multiple of `step` (the tick size).
    pub fn is_multiple_of(&self, step: Price) -> bool {
        (self.0 % step.0).is_zero()
    }
}

impl FromStr for Price {
    type Err = NumericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s).map_err(|e| NumericError::Parse(e.to_string()))?;
        Self::try_new(value)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An order quantity. Never negative; zero only as a remaining amount.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl Quantity {
    /// Construct from a decimal, rejecting negative values.
    pub fn try_new(value: Decimal) -> Result<Self, NumericError> {
        if value < Decimal::ZERO {
            return Err(NumericError::NegativeQuantity(value));
        }
        Ok(Self(value))
    }

    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    pub fn from_u64(value: u64) -> Self {
        Self(Decimal::from(value))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// True if this quantity is an exact multiple of `step` (the lot size).
    pub fn is_multiple_of(&self, step: Quantity) -> bool {
        (self.0 % step.0).is_zero()
    }

    /// Subtraction that fails instead of going negative.
    pub fn checked_sub(&self, rhs: Quantity) -> Option<Quantity> {
        if rhs.0 > self.0 {
            None
        } else {
            Some(Quantity(self.0 - rhs.0))
        }
    }

    pub fn min(self, other: Quantity) -> Quantity {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }
}

impl FromStr for Quantity {
    type Err = NumericError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s).map_err(|e| NumericError::Parse(e.to_string()))?;
        Self::try_new(value)
    }
}

impl Add for Quantity {
    type Output = Quantity;

    fn add(self, rhs: Quantity) -> Quantity {
        Quantity(self.0 + rhs.0)
    }
}

impl Sub for Quantity {
    type Output = Quantity;

    /// # Panics
    /// Panics if the result would be negative. Matching code must use
    /// `checked_sub` when the ordering is not already established.
    fn sub(self, rhs: Quantity) -> Quantity {
        assert!(rhs.0 <= self.0, "quantity subtraction underflow");
        Quantity(self.0 - rhs.0)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
