//! Product (meat cut) and category models

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::types::{Money, Weight};

/// Products expiring within this many days are flagged at the counter
pub const NEAR_EXPIRY_DAYS: i64 = 2;

/// Default minimum stock before a cut is flagged as low
pub const DEFAULT_MIN_STOCK_GRAMS: i64 = 5_000;

/// Default shelf life of a fresh cut
pub const DEFAULT_FRESHNESS_DAYS: u32 = 7;

/// A product category (beef, pork, ...)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A cut of meat sold by weight
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Product {
    pub id: i64,
    /// Scale code, unique
    pub code: String,
    pub name: String,
    pub price_per_kg: Money,
    pub stock: Weight,
    pub min_stock: Weight,
    pub category_id: Option<i64>,
    pub intake_date: NaiveDate,
    pub freshness_days: u32,
    pub is_active: bool,
}

impl Product {
    pub fn expiry_date(&self) -> NaiveDate {
        self.intake_date + Duration::days(i64::from(self.freshness_days))
    }

    /// Days left before expiry; negative once expired
    pub fn days_until_expiry(&self, today: NaiveDate) -> i64 {
        (self.expiry_date() - today).num_days()
    }

    pub fn is_near_expiry(&self, today: NaiveDate) -> bool {
        self.days_until_expiry(today) <= NEAR_EXPIRY_DAYS
    }
}

/// Direction of a stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockDirection {
    Increase,
    Decrease,
}

impl StockDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockDirection::Increase => "increase",
            StockDirection::Decrease => "decrease",
        }
    }
}
