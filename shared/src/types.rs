//! Common types used across the ledger
//!
//! Weights are carried as integer grams and money as integer cents so that
//! stock arithmetic and cash reconciliation never drift. Both serialize as
//! plain decimals (kilograms and currency units).

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised when building a [`Weight`] or [`Money`] value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("amount must not be negative")]
    Negative,

    #[error("amount is out of range")]
    OutOfRange,
}

/// A non-negative weight, stored in grams
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Weight(i64);

impl Weight {
    pub const ZERO: Weight = Weight(0);

    /// Build a weight from whole grams
    pub fn from_grams(grams: i64) -> Result<Self, AmountError> {
        if grams < 0 {
            return Err(AmountError::Negative);
        }
        Ok(Self(grams))
    }

    /// Build a weight from kilograms, rounded to the nearest gram
    pub fn from_kg(kg: Decimal) -> Result<Self, AmountError> {
        let grams = kg
            .checked_mul(Decimal::from(1000))
            .ok_or(AmountError::OutOfRange)?
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .ok_or(AmountError::OutOfRange)?;
        Self::from_grams(grams)
    }

    pub fn grams(self) -> i64 {
        self.0
    }

    pub fn kg(self) -> Decimal {
        Decimal::new(self.0, 3)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Weight) -> Option<Weight> {
        self.0.checked_add(other.0).map(Weight)
    }

    /// Subtract, returning `None` when the result would be negative
    pub fn checked_sub(self, other: Weight) -> Option<Weight> {
        let grams = self.0.checked_sub(other.0)?;
        if grams < 0 {
            None
        } else {
            Some(Weight(grams))
        }
    }
}

impl TryFrom<Decimal> for Weight {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Weight::from_kg(value)
    }
}

impl From<Weight> for Decimal {
    fn from(value: Weight) -> Self {
        value.kg()
    }
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kg", self.kg())
    }
}

/// A signed currency amount, stored in cents
///
/// Signed because cash variances can be negative; prices and cash counts
/// are checked for sign by the validation functions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Build an amount from currency units, rounded to the nearest cent
    pub fn from_amount(amount: Decimal) -> Result<Self, AmountError> {
        amount
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .checked_mul(Decimal::from(100))
            .and_then(|cents| cents.to_i64())
            .map(Self)
            .ok_or(AmountError::OutOfRange)
    }

    pub fn cents(self) -> i64 {
        self.0
    }

    pub fn amount(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    pub fn is_negative(self) -> bool {
        self.0 < 0
    }

    pub fn checked_add(self, other: Money) -> Result<Money, AmountError> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or(AmountError::OutOfRange)
    }

    pub fn checked_sub(self, other: Money) -> Result<Money, AmountError> {
        self.0
            .checked_sub(other.0)
            .map(Money)
            .ok_or(AmountError::OutOfRange)
    }

    /// Price of `weight` at `self` per kilogram, rounded half away from zero
    pub fn for_weight(self, weight: Weight) -> Result<Money, AmountError> {
        let numerator = i128::from(self.0) * i128::from(weight.grams());
        let mut cents = numerator / 1000;
        let remainder = numerator % 1000;
        if remainder.abs() * 2 >= 1000 {
            cents += numerator.signum();
        }
        i64::try_from(cents)
            .map(Money)
            .map_err(|_| AmountError::OutOfRange)
    }
}

impl TryFrom<Decimal> for Money {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Money::from_amount(value)
    }
}

impl From<Money> for Decimal {
    fn from(value: Money) -> Self {
        value.amount()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.amount())
    }
}

/// Inclusive range of calendar dates for report queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: chrono::NaiveDate,
    pub end: chrono::NaiveDate,
}

impl DateRange {
    /// Build a range, swapping the bounds if they arrive reversed
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }
}

/// Preset report periods offered to the till
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportPeriod {
    Today,
    Yesterday,
    Last7Days,
    ThisMonth,
}

impl ReportPeriod {
    /// Resolve the period to concrete dates relative to `today`
    pub fn resolve(self, today: NaiveDate) -> DateRange {
        match self {
            ReportPeriod::Today => DateRange::single_day(today),
            ReportPeriod::Yesterday => DateRange::single_day(today - Duration::days(1)),
            ReportPeriod::Last7Days => DateRange::new(today - Duration::days(6), today),
            ReportPeriod::ThisMonth => {
                let first = today.with_day(1).unwrap_or(today);
                DateRange::new(first, today)
            }
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "today" => Some(ReportPeriod::Today),
            "yesterday" => Some(ReportPeriod::Yesterday),
            "last_7_days" => Some(ReportPeriod::Last7Days),
            "this_month" => Some(ReportPeriod::ThisMonth),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_weight_from_kg_rounds_to_grams() {
        assert_eq!(Weight::from_kg(dec("3")).unwrap().grams(), 3000);
        assert_eq!(Weight::from_kg(dec("0.2505")).unwrap().grams(), 251);
        assert_eq!(Weight::from_kg(dec("1.2344")).unwrap().grams(), 1234);
    }

    #[test]
    fn test_weight_rejects_negative() {
        assert_eq!(Weight::from_kg(dec("-0.5")), Err(AmountError::Negative));
        assert_eq!(Weight::from_grams(-1), Err(AmountError::Negative));
    }

    #[test]
    fn test_weight_checked_sub_never_negative() {
        let ten = Weight::from_grams(10_000).unwrap();
        let three = Weight::from_grams(3_000).unwrap();
        assert_eq!(ten.checked_sub(three), Some(Weight::from_grams(7_000).unwrap()));
        assert_eq!(three.checked_sub(ten), None);
    }

    #[test]
    fn test_money_for_weight_rib_scenario() {
        let price = Money::from_amount(dec("1500")).unwrap();
        let weight = Weight::from_kg(dec("3")).unwrap();
        assert_eq!(price.for_weight(weight).unwrap().amount(), dec("4500.00"));
    }

    #[test]
    fn test_money_for_weight_rounds_half_away() {
        // 0.333 kg at 10.05 per kg = 3.34665 -> 3.35
        let price = Money::from_amount(dec("10.05")).unwrap();
        let weight = Weight::from_grams(333).unwrap();
        assert_eq!(price.for_weight(weight).unwrap().cents(), 335);
    }

    #[test]
    fn test_money_serializes_as_decimal() {
        let money = Money::from_cents(123_456);
        let json = serde_json::to_string(&money).unwrap();
        assert_eq!(json, "\"1234.56\"");
        let back: Money = serde_json::from_str(&json).unwrap();
        assert_eq!(back, money);
    }

    #[test]
    fn test_weight_deserialize_rejects_negative() {
        let parsed: Result<Weight, _> = serde_json::from_str("\"-1.0\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_weight_deserialize_rejects_oversized_kg() {
        let parsed: Result<Weight, _> = serde_json::from_str("\"79228162514264337593543950335\"");
        assert!(parsed.is_err());
        assert_eq!(
            Weight::from_kg(Decimal::MAX),
            Err(AmountError::OutOfRange)
        );
    }

    #[test]
    fn test_money_checked_arithmetic_reports_overflow() {
        let half = Money::from_cents(i64::MAX / 2 + 1);
        assert_eq!(half.checked_add(half), Err(AmountError::OutOfRange));
        assert_eq!(
            Money::from_cents(i64::MIN).checked_sub(Money::from_cents(1)),
            Err(AmountError::OutOfRange)
        );
        assert_eq!(
            Money::from_cents(500).checked_sub(Money::from_cents(700)),
            Ok(Money::from_cents(-200))
        );
    }

    #[test]
    fn test_report_period_resolution() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(ReportPeriod::Today.resolve(today), DateRange::single_day(today));
        assert_eq!(
            ReportPeriod::Yesterday.resolve(today),
            DateRange::single_day(NaiveDate::from_ymd_opt(2024, 3, 14).unwrap())
        );
        let week = ReportPeriod::Last7Days.resolve(today);
        assert_eq!(week.start, NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(week.end, today);
        let month = ReportPeriod::ThisMonth.resolve(today);
        assert_eq!(month.start, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(month.end, today);
    }

    #[test]
    fn test_date_range_swaps_reversed_bounds() {
        let a = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let range = DateRange::new(a, b);
        assert_eq!(range.start, b);
        assert_eq!(range.end, a);
    }
}
