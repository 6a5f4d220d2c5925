//! Sale, sale line and reversal models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AmountError, Money, Weight};

/// How the customer paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Transfer,
    Card,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::Cash,
        PaymentMethod::Transfer,
        PaymentMethod::Card,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Card => "card",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "cash" => Some(PaymentMethod::Cash),
            "transfer" => Some(PaymentMethod::Transfer),
            "card" => Some(PaymentMethod::Card),
            _ => None,
        }
    }
}

/// A completed sale (one ticket)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sale {
    pub id: i64,
    pub ticket_number: i64,
    pub operator_id: i64,
    pub created_at: DateTime<Utc>,
    pub shift_label: String,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub reversed: bool,
}

/// One weighed item on a ticket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SaleLine {
    pub id: i64,
    pub sale_id: i64,
    pub product_id: i64,
    pub weight: Weight,
    /// Price per kg at the moment of sale
    pub unit_price: Money,
    pub subtotal: Money,
}

/// Compensating record for a cancelled sale
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SaleReversal {
    pub id: i64,
    pub sale_id: i64,
    pub operator_id: i64,
    pub created_at: DateTime<Utc>,
    pub reason: String,
}

/// Price a list of `(weight, price per kg)` lines.
///
/// Returns each subtotal plus the ticket total, or `OutOfRange` when a
/// subtotal or the total does not fit in cents.
pub fn price_lines(lines: &[(Weight, Money)]) -> Result<(Vec<Money>, Money), AmountError> {
    let subtotals = lines
        .iter()
        .map(|(weight, price)| price.for_weight(*weight))
        .collect::<Result<Vec<_>, _>>()?;
    let total = subtotals
        .iter()
        .try_fold(Money::ZERO, |acc, subtotal| acc.checked_add(*subtotal))?;
    Ok((subtotals, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_method_round_trip_names() {
        for method in PaymentMethod::ALL {
            assert_eq!(PaymentMethod::from_str(method.as_str()), Some(method));
        }
        assert_eq!(PaymentMethod::from_str("cheque"), None);
    }

    #[test]
    fn test_price_lines_total_matches_subtotals() {
        let lines = vec![
            (Weight::from_grams(3_000).unwrap(), Money::from_cents(150_000)),
            (Weight::from_grams(1_250).unwrap(), Money::from_cents(220_000)),
        ];
        let (subtotals, total) = price_lines(&lines).unwrap();
        assert_eq!(subtotals, vec![Money::from_cents(450_000), Money::from_cents(275_000)]);
        assert_eq!(total, Money::from_cents(725_000));
    }

    #[test]
    fn test_price_lines_total_overflow_is_out_of_range() {
        let one_kg = Weight::from_grams(1_000).unwrap();
        let lines = vec![(one_kg, Money::from_cents(i64::MAX / 2 + 1)); 2];
        assert_eq!(price_lines(&lines), Err(AmountError::OutOfRange));
    }

    #[test]
    fn test_payment_method_serde_lowercase() {
        let json = serde_json::to_string(&PaymentMethod::Transfer).unwrap();
        assert_eq!(json, "\"transfer\"");
    }
}
