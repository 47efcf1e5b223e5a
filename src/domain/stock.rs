//! Stock ledger checks.
//!
//! Checkout's read-only pre-check, the settlement commit of both stores and
//! the cart all go through [`is_insufficient`], so what checkout promises and
//! what settlement enforces cannot drift apart.

use serde::Serialize;
use std::fmt;
use uuid::Uuid;

/// A line that asks for some quantity of a stocked product.
pub trait StockLine {
    fn product_id(&self) -> Uuid;
    fn product_name(&self) -> &str;
    fn requested(&self) -> i32;
    fn available(&self) -> i32;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StockShortage {
    pub product_id: Uuid,
    pub product: String,
    pub available: i32,
    pub requested: i32,
}

impl fmt::Display for StockShortage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (available: {}, requested: {})", self.product, self.available, self.requested)
    }
}

/// One line per shortage, for logs.
pub fn describe(shortages: &[StockShortage]) -> String {
    shortages.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}

pub fn is_insufficient(requested: i32, available: i32) -> bool { requested > available }

/// Every line whose requested quantity exceeds stock, in input order.
pub fn find_shortages<'a, L, I>(lines: I) -> Vec<StockShortage>
where
    L: StockLine + 'a,
    I: IntoIterator<Item = &'a L>,
{
    lines
        .into_iter()
        .filter(|l| is_insufficient(l.requested(), l.available()))
        .map(|l| StockShortage {
            product_id: l.product_id(),
            product: l.product_name().to_string(),
            available: l.available(),
            requested: l.requested(),
        })
        .collect()
}

pub fn ensure_available<'a, L, I>(lines: I) -> Result<(), Vec<StockShortage>>
where
    L: StockLine + 'a,
    I: IntoIterator<Item = &'a L>,
{
    let shortages = find_shortages(lines);
    if shortages.is_empty() { Ok(()) } else { Err(shortages) }
}

/// Remaining stock after taking `requested`, or `None` when that would go negative.
pub fn decrement(available: i32, requested: i32) -> Option<i32> {
    if is_insufficient(requested, available) { None } else { Some(available - requested) }
}
