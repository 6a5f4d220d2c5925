//! Half-carcass intake and butchering models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Weight};

/// A bulk raw unit (half carcass) received from a supplier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BulkUnit {
    pub id: i64,
    pub arrived_at: DateTime<Utc>,
    pub initial_weight: Weight,
    pub cost: Money,
    pub supplier: String,
    /// Total weight turned into product stock so far
    pub weight_processed: Weight,
    /// Yield loss, always `initial_weight - weight_processed`
    pub waste: Weight,
}

impl BulkUnit {
    /// Weight still available for butchering
    pub fn remaining(&self) -> Weight {
        self.initial_weight
            .checked_sub(self.weight_processed)
            .unwrap_or(Weight::ZERO)
    }

    /// Processed weight as a percentage of the initial weight
    pub fn yield_percent(&self) -> Decimal {
        if self.initial_weight.is_zero() {
            return Decimal::ZERO;
        }
        (Decimal::from(self.weight_processed.grams()) / Decimal::from(self.initial_weight.grams()))
            * Decimal::from(100)
    }
}

/// Processed weight and waste after allocating `allocated` more weight.
///
/// Returns `None` when the allocation would exceed the initial weight.
pub fn apply_allocation(
    initial: Weight,
    processed: Weight,
    allocated: Weight,
) -> Option<(Weight, Weight)> {
    let new_processed = processed.checked_add(allocated)?;
    let waste = initial.checked_sub(new_processed)?;
    Some((new_processed, waste))
}

/// One piece of a bulk unit moved into a product's stock
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ButcherRecord {
    pub id: i64,
    pub bulk_unit_id: i64,
    pub product_id: i64,
    pub weight: Weight,
    pub created_at: DateTime<Utc>,
    pub operator_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kg(n: i64) -> Weight {
        Weight::from_grams(n * 1000).unwrap()
    }

    #[test]
    fn test_apply_allocation_computes_waste() {
        let (processed, waste) = apply_allocation(kg(100), Weight::ZERO, kg(95)).unwrap();
        assert_eq!(processed, kg(95));
        assert_eq!(waste, kg(5));
    }

    #[test]
    fn test_apply_allocation_rejects_overallocation() {
        assert!(apply_allocation(kg(100), kg(95), kg(6)).is_none());
        assert!(apply_allocation(kg(100), kg(95), kg(5)).is_some());
    }

    #[test]
    fn test_bulk_unit_remaining_and_yield() {
        let unit = BulkUnit {
            id: 1,
            arrived_at: Utc::now(),
            initial_weight: kg(100),
            cost: Money::from_cents(50_000_00),
            supplier: "Frigorifico Sur".to_string(),
            weight_processed: kg(80),
            waste: kg(20),
        };
        assert_eq!(unit.remaining(), kg(20));
        assert_eq!(unit.yield_percent(), Decimal::from(80));
    }
}
