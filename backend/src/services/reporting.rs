//! Reporting service for sales analytics and data export
//! Read-only aggregates over local date ranges; cancelled sales never count

use std::collections::BTreeMap;

use chrono::{Local, Timelike};
use serde::Serialize;
use sqlx::FromRow;

use crate::db::{from_millis, range_bounds_millis, stored_weight, Store};
use crate::error::AppResult;
use shared::types::{DateRange, Money, Weight};

pub const DEFAULT_TOP_LIMIT: i64 = 10;

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    store: Store,
}

/// Product ranking entry
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProductSales {
    pub product_id: i64,
    pub code: String,
    pub name: String,
    pub weight_sold: Weight,
    pub revenue: Money,
}

/// Sales made by one operator
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OperatorRevenue {
    pub operator_id: i64,
    pub username: String,
    pub sale_count: i64,
    pub total: Money,
}

/// Sales in one local hour of the day (0-23)
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HourlyRevenue {
    pub hour: u32,
    pub sale_count: i64,
    pub total: Money,
}

/// Headline figures for a period
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RevenueSummary {
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    pub sale_count: i64,
    pub total: Money,
}

#[derive(Debug, FromRow)]
struct ProductSalesRow {
    product_id: i64,
    code: String,
    name: String,
    weight_grams: i64,
    revenue_cents: i64,
}

#[derive(Debug, FromRow)]
struct OperatorRevenueRow {
    operator_id: i64,
    username: String,
    sale_count: i64,
    total_cents: i64,
}

/// Order of a product ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductRanking {
    ByWeight,
    ByRevenue,
}

const NOT_REVERSED: &str = "NOT EXISTS (SELECT 1 FROM sale_reversals r WHERE r.sale_id = s.id)";

impl ReportingService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    async fn top_products(
        &self,
        range: &DateRange,
        limit: i64,
        ranking: ProductRanking,
    ) -> AppResult<Vec<ProductSales>> {
        let (start, end) = range_bounds_millis(range);
        let order = match ranking {
            ProductRanking::ByWeight => "weight_grams DESC, revenue_cents DESC",
            ProductRanking::ByRevenue => "revenue_cents DESC, weight_grams DESC",
        };
        let rows = sqlx::query_as::<_, ProductSalesRow>(&format!(
            r#"
            SELECT p.id AS product_id, p.code, p.name,
                   SUM(l.weight_grams) AS weight_grams,
                   SUM(l.subtotal_cents) AS revenue_cents
            FROM sale_lines l
            JOIN sales s ON s.id = l.sale_id
            JOIN products p ON p.id = l.product_id
            WHERE s.created_at >= ? AND s.created_at < ? AND {}
            GROUP BY p.id, p.code, p.name
            ORDER BY {}, p.name
            LIMIT ?
            "#,
            NOT_REVERSED, order
        ))
        .bind(start)
        .bind(end)
        .bind(limit.max(1))
        .fetch_all(self.store.pool())
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(ProductSales {
                    product_id: row.product_id,
                    code: row.code,
                    name: row.name,
                    weight_sold: stored_weight(row.weight_grams)?,
                    revenue: Money::from_cents(row.revenue_cents),
                })
            })
            .collect()
    }

    /// Best-selling cuts by weight
    pub async fn top_products_by_weight(
        &self,
        range: &DateRange,
        limit: i64,
    ) -> AppResult<Vec<ProductSales>> {
        self.top_products(range, limit, ProductRanking::ByWeight).await
    }

    /// Best-selling cuts by revenue
    pub async fn top_products_by_revenue(
        &self,
        range: &DateRange,
        limit: i64,
    ) -> AppResult<Vec<ProductSales>> {
        self.top_products(range, limit, ProductRanking::ByRevenue).await
    }

    pub async fn revenue_by_operator(&self, range: &DateRange) -> AppResult<Vec<OperatorRevenue>> {
        let (start, end) = range_bounds_millis(range);
        let rows = sqlx::query_as::<_, OperatorRevenueRow>(&format!(
            r#"
            SELECT u.id AS operator_id, u.username,
                   COUNT(s.id) AS sale_count,
                   SUM(s.total_cents) AS total_cents
            FROM sales s
            JOIN users u ON u.id = s.operator_id
            WHERE s.created_at >= ? AND s.created_at < ? AND {}
            GROUP BY u.id, u.username
            ORDER BY total_cents DESC, u.username
            "#,
            NOT_REVERSED
        ))
        .bind(start)
        .bind(end)
        .fetch_all(self.store.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| OperatorRevenue {
                operator_id: row.operator_id,
                username: row.username,
                sale_count: row.sale_count,
                total: Money::from_cents(row.total_cents),
            })
            .collect())
    }

    /// Sales grouped by local hour of day; hours without sales are omitted
    pub async fn revenue_by_hour(&self, range: &DateRange) -> AppResult<Vec<HourlyRevenue>> {
        let (start, end) = range_bounds_millis(range);
        let rows: Vec<(i64, i64)> = sqlx::query_as(&format!(
            "SELECT s.created_at, s.total_cents FROM sales s \
             WHERE s.created_at >= ? AND s.created_at < ? AND {}",
            NOT_REVERSED
        ))
        .bind(start)
        .bind(end)
        .fetch_all(self.store.pool())
        .await?;

        Ok(bucket_by_hour(rows))
    }

    pub async fn total_revenue(&self, range: &DateRange) -> AppResult<RevenueSummary> {
        let (start, end) = range_bounds_millis(range);
        let (sale_count, total_cents): (i64, i64) = sqlx::query_as(&format!(
            "SELECT COUNT(s.id), COALESCE(SUM(s.total_cents), 0) FROM sales s \
             WHERE s.created_at >= ? AND s.created_at < ? AND {}",
            NOT_REVERSED
        ))
        .bind(start)
        .bind(end)
        .fetch_one(self.store.pool())
        .await?;

        Ok(RevenueSummary {
            start_date: range.start,
            end_date: range.end,
            sale_count,
            total: Money::from_cents(total_cents),
        })
    }

    /// Export report data as CSV
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record).map_err(|e| {
                crate::error::AppError::Internal(format!("CSV serialization error: {}", e))
            })?;
        }
        let csv_data = String::from_utf8(wtr.into_inner().map_err(|e| {
            crate::error::AppError::Internal(format!("CSV writer error: {}", e))
        })?)
        .map_err(|e| crate::error::AppError::Internal(format!("UTF-8 conversion error: {}", e)))?;
        Ok(csv_data)
    }
}

/// Group `(created_at millis, total cents)` pairs by local hour
fn bucket_by_hour(rows: Vec<(i64, i64)>) -> Vec<HourlyRevenue> {
    let mut buckets: BTreeMap<u32, (i64, i64)> = BTreeMap::new();
    for (created_at, cents) in rows {
        let hour = from_millis(created_at).with_timezone(&Local).hour();
        let entry = buckets.entry(hour).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += cents;
    }
    buckets
        .into_iter()
        .map(|(hour, (sale_count, cents))| HourlyRevenue {
            hour,
            sale_count,
            total: Money::from_cents(cents),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_by_hour_groups_and_sorts() {
        let base = crate::db::local_day_start_millis(
            chrono::NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
        );
        let hour = 3_600_000;
        let rows = vec![
            (base + 14 * hour + 5, 1_000),
            (base + 9 * hour, 2_500),
            (base + 14 * hour + 59 * 60_000, 500),
        ];
        let buckets = bucket_by_hour(rows);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].hour, 9);
        assert_eq!(buckets[1].hour, 14);
        assert_eq!(buckets[1].sale_count, 2);
        assert_eq!(buckets[1].total, Money::from_cents(1_500));
    }

    #[test]
    fn test_export_to_csv_writes_header_and_rows() {
        let rows = vec![OperatorRevenue {
            operator_id: 1,
            username: "admin".to_string(),
            sale_count: 3,
            total: Money::from_cents(250_000),
        }];
        let csv = ReportingService::export_to_csv(&rows).unwrap();
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("operator_id,username,sale_count,total"));
        assert_eq!(lines.next(), Some("1,admin,3,2500.00"));
    }
}
