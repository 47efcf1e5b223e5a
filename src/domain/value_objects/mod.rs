//! Value Objects for the storefront

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;

/// Money value object. Prices are single-currency fixed-point decimals; the
/// currency only appears when talking to the payment gateway.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub fn new(amount: Decimal) -> Self { Self(amount) }
    pub fn zero() -> Self { Self(Decimal::ZERO) }
    pub fn amount(&self) -> Decimal { self.0 }
    pub fn add(&self, other: &Money) -> Money { Money(self.0 + other.0) }
    pub fn multiply(&self, qty: i32) -> Money { Money(self.0 * Decimal::from(qty)) }

    /// Integer amount in the gateway's smallest unit, `amount * 10^exponent`
    /// with the fractional remainder truncated.
    pub fn to_minor_units(&self, exponent: u32) -> Result<i64, MoneyError> {
        if self.0.is_sign_negative() { return Err(MoneyError::Negative); }
        let factor = 10i64.checked_pow(exponent).ok_or(MoneyError::Overflow)?;
        let scaled = self.0.checked_mul(Decimal::from(factor)).ok_or(MoneyError::Overflow)?;
        scaled.trunc().to_i64().ok_or(MoneyError::Overflow)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self { Self(amount) }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self { iter.fold(Money::zero(), |acc, m| acc.add(&m)) }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum MoneyError { Negative, Overflow }
impl std::error::Error for MoneyError {}
impl fmt::Display for MoneyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Negative => write!(f, "Negative amount"), Self::Overflow => write!(f, "Amount out of range") }
    }
}

/// Authority value object: the gateway's opaque payment attempt token.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Authority(String);

impl Authority {
    pub fn new(value: impl Into<String>) -> Result<Self, AuthorityError> {
        let value = value.into().trim().to_string();
        if value.is_empty() { return Err(AuthorityError::Empty); }
        if value.len() > 64 { return Err(AuthorityError::TooLong); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum AuthorityError { Empty, TooLong }
impl std::error::Error for AuthorityError {}
impl fmt::Display for AuthorityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Empty => write!(f, "Authority empty"), Self::TooLong => write!(f, "Authority too long") }
    }
}
