//! Amount type for handling monetary values exchanged with the server.
//!
//! This module provides the `Amount` type which wraps `Decimal`. The persistence layer behind the
//! API serializes decimals either as JSON numbers or as numeric text (e.g. `"42.50"`), so parsing
//! accepts both. This is the single place where that coercion happens.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::error::Error;
use std::fmt;
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// Currency precision, in decimal places.
pub const CURRENCY_SCALE: u32 = 2;

/// The largest magnitude accepted from the server or the command line, in cents (one trillion).
pub const MAX_CENTS: i64 = 100_000_000_000_000;

/// Represents a currency amount.
///
/// The value is held as a `Decimal` rounded to currency precision, so sums never drift the way
/// binary floats do. Equality is numeric: `42.5` and `42.50` are the same amount.
///
/// # Examples
///
/// Parsing numeric text:
/// ```
/// # use budgetzen_sync::model::Amount;
/// # use std::str::FromStr;
/// let amount = Amount::from_str("1234.5").unwrap();
/// assert_eq!(amount.to_string(), "$1,234.50");
/// ```
///
/// Text that is not a number is rejected rather than turned into something that poisons totals:
/// ```
/// # use budgetzen_sync::model::Amount;
/// # use std::str::FromStr;
/// assert!(Amount::from_str("12,50 EUR").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

impl Amount {
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    /// Creates a new Amount, rounding `value` to currency precision. Halves round away from zero.
    pub fn new(value: Decimal) -> Self {
        Self(value.round_dp_with_strategy(
            CURRENCY_SCALE,
            RoundingStrategy::MidpointAwayFromZero,
        ))
    }

    /// The largest amount `is_in_range` accepts.
    pub fn max() -> Self {
        Self::from_cents(MAX_CENTS)
    }

    /// True when the magnitude is at most `Amount::max()`. Totals of in-range amounts cannot
    /// overflow.
    pub fn is_in_range(&self) -> bool {
        self.0.abs() <= Self::max().0
    }

    /// Creates an amount from a count of cents, e.g. `Amount::from_cents(4250)` is `42.50`.
    pub fn from_cents(cents: i64) -> Self {
        Self(Decimal::new(cents, CURRENCY_SCALE))
    }

    /// Returns the underlying Decimal value.
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        !self.is_zero() && self.0.is_sign_negative()
    }

    /// The value as a float, for callers that hand it to charting code.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }

    /// Builds an amount from a float. Returns `None` for NaN and infinities.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        // Go through the shortest decimal representation of the float, which is what a human
        // (or the server) wrote, instead of its exact binary expansion.
        Decimal::from_str(&value.to_string())
            .ok()
            .or_else(|| Decimal::from_f64(value))
            .map(Amount::new)
    }
}

/// An error that can occur when parsing strings into `Amount` values.
pub struct AmountError(String);

impl Debug for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for AmountError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a valid amount", self.0)
    }
}

impl Error for AmountError {}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AmountError(s.to_string()));
        }
        // Decimal::from_str accepts things like "1_000", the server never sends those
        let looks_numeric = trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == '-' || c == '+');
        if !looks_numeric {
            return Err(AmountError(s.to_string()));
        }
        Decimal::from_str(trimmed)
            .map(Amount::new)
            .map_err(|_| AmountError(s.to_string()))
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        write!(
            f,
            "{sign}${}",
            format_num::format_num!(",.2", self.0.abs().to_f64().unwrap_or_default())
        )
    }
}

impl Serialize for Amount {
    /// Amounts go out as JSON numbers, which is what the create and update endpoints validate.
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(self.to_f64())
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(AmountVisitor)
    }
}

struct AmountVisitor;

impl Visitor<'_> for AmountVisitor {
    type Value = Amount;

    fn expecting(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("a number or numeric text")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Amount, E> {
        Ok(Amount::new(Decimal::from(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Amount, E> {
        Ok(Amount::new(Decimal::from(v)))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Amount, E> {
        Amount::from_f64(v).ok_or_else(|| E::custom(format!("{v} is not a valid amount")))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Amount, E> {
        Amount::from_str(v).map_err(E::custom)
    }
}

impl From<Decimal> for Amount {
    fn from(value: Decimal) -> Self {
        Amount::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.value()
    }
}

impl std::ops::Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_sub(rhs.0))
    }
}

impl std::ops::AddAssign for Amount {
    fn add_assign(&mut self, rhs: Amount) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl std::iter::Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Amount {
        iter.fold(Amount::ZERO, |acc, a| acc + a)
    }
}

impl<'a> std::iter::Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Amount {
        iter.copied().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text() {
        let amount = Amount::from_str("42.50").unwrap();
        assert_eq!(amount.value(), Decimal::new(425, 1));
    }

    #[test]
    fn test_parse_whitespace() {
        let amount = Amount::from_str("  19.99 ").unwrap();
        assert_eq!(amount, Amount::from_cents(1999));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Amount::from_str("").is_err());
        assert!(Amount::from_str("abc").is_err());
        assert!(Amount::from_str("NaN").is_err());
        assert!(Amount::from_str("1_000").is_err());
        assert!(Amount::from_str("1.2.3").is_err());
    }

    #[test]
    fn test_rounds_to_currency_precision() {
        let amount = Amount::from_str("10.005").unwrap();
        assert_eq!(amount.value().scale(), 2);
        assert_eq!(amount, Amount::from_cents(1001));
        assert_eq!(Amount::from_str("10.015").unwrap(), Amount::from_cents(1002));
        assert_eq!(Amount::from_str("10.004").unwrap(), Amount::from_cents(1000));
    }

    #[test]
    fn test_range() {
        assert!(Amount::max().is_in_range());
        assert!(Amount::from_cents(-MAX_CENTS).is_in_range());
        assert!(!Amount::from_cents(MAX_CENTS + 1).is_in_range());
        let huge = Amount::from_str("79228162514264337593543950335").unwrap();
        assert!(!huge.is_in_range());
    }

    #[test]
    fn test_sum_of_huge_amounts_saturates() {
        let huge = Amount::from_str("79228162514264337593543950335").unwrap();
        let total: Amount = [huge, huge].iter().sum();
        assert_eq!(total.value(), Decimal::MAX);
        let mut acc = huge;
        acc += huge;
        assert_eq!(acc, total);
        assert_eq!((Amount::ZERO - huge - huge).value(), Decimal::MIN);
    }

    #[test]
    fn test_display() {
        assert_eq!(Amount::from_cents(4250).to_string(), "$42.50");
        assert_eq!(Amount::from_cents(123456789).to_string(), "$1,234,567.89");
        assert_eq!(Amount::from_cents(-500).to_string(), "-$5.00");
        assert_eq!(Amount::ZERO.to_string(), "$0.00");
    }

    #[test]
    fn test_deserialize_number_and_text() {
        let a: Amount = serde_json::from_str("42.5").unwrap();
        let b: Amount = serde_json::from_str("\"42.50\"").unwrap();
        let c: Amount = serde_json::from_str("42").unwrap();
        assert_eq!(a, b);
        assert_eq!(c, Amount::from_cents(4200));
    }

    #[test]
    fn test_deserialize_rejects_bad_text() {
        assert!(serde_json::from_str::<Amount>("\"forty\"").is_err());
        assert!(serde_json::from_str::<Amount>("true").is_err());
        assert!(serde_json::from_str::<Amount>("null").is_err());
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&Amount::from_cents(4250)).unwrap();
        assert_eq!(json, "42.5");
    }

    #[test]
    fn test_no_float_drift() {
        let total: Amount = ["0.10", "0.20"]
            .iter()
            .map(|s| Amount::from_str(s).unwrap())
            .sum();
        assert_eq!(total, Amount::from_cents(30));
    }

    #[test]
    fn test_from_f64() {
        assert_eq!(Amount::from_f64(42.5), Some(Amount::from_cents(4250)));
        assert_eq!(Amount::from_f64(0.1), Some(Amount::from_cents(10)));
        assert_eq!(Amount::from_f64(f64::NAN), None);
        assert_eq!(Amount::from_f64(f64::INFINITY), None);
    }
}
