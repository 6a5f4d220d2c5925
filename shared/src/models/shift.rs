//! Cashier shift and cash reconciliation models

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::PaymentMethod;
use crate::types::{AmountError, Money};

/// Lifecycle of a shift; closed is terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftStatus {
    Open,
    Closed,
}

/// A cashier's drawer session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Shift {
    pub id: i64,
    pub operator_id: i64,
    pub date: NaiveDate,
    pub label: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub starting_cash: Money,
    pub counted_cash: Option<Money>,
    pub variance: Option<Money>,
}

impl Shift {
    pub fn status(&self) -> ShiftStatus {
        if self.ended_at.is_some() {
            ShiftStatus::Closed
        } else {
            ShiftStatus::Open
        }
    }

    pub fn is_open(&self) -> bool {
        self.status() == ShiftStatus::Open
    }
}

/// Sales totals per payment method over a shift window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentTotals {
    pub cash: Money,
    pub transfer: Money,
    pub card: Money,
}

impl PaymentTotals {
    pub fn add(&mut self, method: PaymentMethod, amount: Money) -> Result<(), AmountError> {
        let slot = match method {
            PaymentMethod::Cash => &mut self.cash,
            PaymentMethod::Transfer => &mut self.transfer,
            PaymentMethod::Card => &mut self.card,
        };
        *slot = slot.checked_add(amount)?;
        Ok(())
    }
}

/// Persisted end-of-shift cash count
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reconciliation {
    pub id: i64,
    pub shift_id: i64,
    /// Cash sales recorded by the system during the shift
    pub cash_sales: Money,
    /// Starting cash plus cash sales
    pub expected_cash: Money,
    pub counted_cash: Money,
    pub transfer_total: Money,
    pub card_total: Money,
    pub variance: Money,
}

/// Outcome of closing a shift
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconciliationReport {
    pub shift_id: i64,
    pub starting_cash: Money,
    pub cash_sales: Money,
    pub expected_cash: Money,
    pub counted_cash: Money,
    pub transfer_total: Money,
    pub card_total: Money,
    pub variance: Money,
}

/// Expected drawer cash and variance for a counted drawer.
///
/// `expected = starting + cash sales`, `variance = counted - expected`.
pub fn reconcile(
    starting_cash: Money,
    totals: &PaymentTotals,
    counted_cash: Money,
) -> Result<(Money, Money), AmountError> {
    let expected = starting_cash.checked_add(totals.cash)?;
    let variance = counted_cash.checked_sub(expected)?;
    Ok((expected, variance))
}
