//! Sale transaction service
//!
//! A sale is written as one unit: ticket number, sale row, its lines and the
//! stock decrement of every line either all commit or none do.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};

use crate::db::{from_millis, range_bounds_millis, stored_weight, to_millis, Store};
use crate::error::{ensure_valid, AppError, AppResult};
use crate::services::activity::ActivityLog;
use crate::services::stock::{apply_stock_delta, fetch_product};
use shared::models::{price_lines, PaymentMethod, Sale, SaleLine, SaleReversal, StockDirection};
use shared::types::{DateRange, Money, Weight};
use shared::validation::{validate_positive_weight, validate_shift_label};

/// Sale service
#[derive(Clone)]
pub struct SaleService {
    store: Store,
    activity: ActivityLog,
}

/// One weighed item in the cart
#[derive(Debug, Clone, Deserialize)]
pub struct SaleItemInput {
    pub product_id: i64,
    pub weight: Weight,
}

/// Input for recording a sale
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSaleInput {
    pub shift_label: String,
    pub payment_method: Option<PaymentMethod>,
    pub items: Vec<SaleItemInput>,
}

/// Input for cancelling a sale
#[derive(Debug, Deserialize)]
pub struct CancelSaleInput {
    pub reason: String,
}

/// A line on the printed receipt
#[derive(Debug, Clone, Serialize)]
pub struct ReceiptLine {
    pub product_id: i64,
    pub product_name: String,
    pub weight: Weight,
    pub unit_price: Money,
    pub subtotal: Money,
}

/// Result of a committed sale
#[derive(Debug, Clone, Serialize)]
pub struct SaleReceipt {
    pub sale_id: i64,
    pub ticket_number: i64,
    pub total: Money,
    pub payment_method: PaymentMethod,
    pub lines: Vec<ReceiptLine>,
}

/// A sale with its lines
#[derive(Debug, Clone, Serialize)]
pub struct SaleDetail {
    #[serde(flatten)]
    pub sale: Sale,
    pub lines: Vec<SaleLine>,
}

#[derive(Debug, FromRow)]
struct SaleRow {
    id: i64,
    ticket_number: i64,
    operator_id: i64,
    created_at: i64,
    shift_label: String,
    total_cents: i64,
    payment_method: String,
    reversed: bool,
}

impl TryFrom<SaleRow> for Sale {
    type Error = AppError;

    fn try_from(row: SaleRow) -> AppResult<Self> {
        let payment_method = PaymentMethod::from_str(&row.payment_method).ok_or_else(|| {
            AppError::Internal(format!("Unknown payment method {}", row.payment_method))
        })?;
        Ok(Sale {
            id: row.id,
            ticket_number: row.ticket_number,
            operator_id: row.operator_id,
            created_at: from_millis(row.created_at),
            shift_label: row.shift_label,
            total: Money::from_cents(row.total_cents),
            payment_method,
            reversed: row.reversed,
        })
    }
}

#[derive(Debug, FromRow)]
struct SaleLineRow {
    id: i64,
    sale_id: i64,
    product_id: i64,
    weight_grams: i64,
    unit_price_cents: i64,
    subtotal_cents: i64,
}

impl TryFrom<SaleLineRow> for SaleLine {
    type Error = AppError;

    fn try_from(row: SaleLineRow) -> AppResult<Self> {
        Ok(SaleLine {
            id: row.id,
            sale_id: row.sale_id,
            product_id: row.product_id,
            weight: stored_weight(row.weight_grams)?,
            unit_price: Money::from_cents(row.unit_price_cents),
            subtotal: Money::from_cents(row.subtotal_cents),
        })
    }
}

const SALE_SELECT: &str = r#"
    SELECT s.id, s.ticket_number, s.operator_id, s.created_at, s.shift_label,
           s.total_cents, s.payment_method,
           EXISTS (SELECT 1 FROM sale_reversals r WHERE r.sale_id = s.id) AS reversed
    FROM sales s
"#;

async fn fetch_sale_by_ticket(conn: &mut SqliteConnection, ticket_number: i64) -> AppResult<Sale> {
    sqlx::query_as::<_, SaleRow>(&format!("{} WHERE s.ticket_number = ?", SALE_SELECT))
        .bind(ticket_number)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Sale with ticket {}", ticket_number)))?
        .try_into()
}

async fn fetch_lines(conn: &mut SqliteConnection, sale_id: i64) -> AppResult<Vec<SaleLine>> {
    let rows = sqlx::query_as::<_, SaleLineRow>(
        r#"
        SELECT id, sale_id, product_id, weight_grams, unit_price_cents, subtotal_cents
        FROM sale_lines
        WHERE sale_id = ?
        ORDER BY id
        "#,
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;
    rows.into_iter().map(SaleLine::try_from).collect()
}

impl SaleService {
    pub fn new(store: Store, activity: ActivityLog) -> Self {
        Self { store, activity }
    }

    /// Record a sale and decrement stock for every line
    pub async fn create_sale(
        &self,
        operator_id: i64,
        input: CreateSaleInput,
    ) -> AppResult<SaleReceipt> {
        // Everything that can be checked without the store is checked first
        if input.items.is_empty() {
            return Err(AppError::validation("items", "Cart is empty"));
        }
        let payment_method = input
            .payment_method
            .ok_or_else(|| AppError::validation("payment_method", "Payment method is required"))?;
        let shift_label = input.shift_label.trim().to_string();
        ensure_valid("shift_label", validate_shift_label(&shift_label))?;
        for item in &input.items {
            ensure_valid("weight", validate_positive_weight(item.weight))?;
        }

        let mut tx = self.store.begin_write().await?;

        let last_ticket: Option<i64> = sqlx::query_scalar("SELECT MAX(ticket_number) FROM sales")
            .fetch_one(&mut *tx)
            .await?;
        let ticket_number = last_ticket.unwrap_or(0) + 1;

        // Price every line from the product rows as they are inside this transaction
        let mut products = Vec::with_capacity(input.items.len());
        for item in &input.items {
            let product = fetch_product(&mut tx, item.product_id).await?;
            if !product.is_active {
                return Err(AppError::validation(
                    "product_id",
                    format!("Product {} is not available for sale", product.name),
                ));
            }
            products.push(product);
        }
        let priced: Vec<(Weight, Money)> = input
            .items
            .iter()
            .zip(&products)
            .map(|(item, product)| (item.weight, product.price_per_kg))
            .collect();
        let (subtotals, total) = price_lines(&priced)
            .map_err(|_| AppError::validation("items", "Ticket total is out of range"))?;
        let lines: Vec<ReceiptLine> = input
            .items
            .iter()
            .zip(products)
            .zip(subtotals)
            .map(|((item, product), subtotal)| ReceiptLine {
                product_id: product.id,
                product_name: product.name,
                weight: item.weight,
                unit_price: product.price_per_kg,
                subtotal,
            })
            .collect();

        let sale_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO sales
                (ticket_number, operator_id, created_at, shift_label, total_cents, payment_method)
            VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(ticket_number)
        .bind(operator_id)
        .bind(to_millis(Utc::now()))
        .bind(&shift_label)
        .bind(total.cents())
        .bind(payment_method.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::unique_or_storage(e, "ticket number"))?;

        for line in &lines {
            sqlx::query(
                r#"
                INSERT INTO sale_lines
                    (sale_id, product_id, weight_grams, unit_price_cents, subtotal_cents)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(sale_id)
            .bind(line.product_id)
            .bind(line.weight.grams())
            .bind(line.unit_price.cents())
            .bind(line.subtotal.cents())
            .execute(&mut *tx)
            .await?;

            apply_stock_delta(&mut tx, line.product_id, line.weight, StockDirection::Decrease)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(
            sale_id,
            ticket_number,
            operator_id,
            total = %total,
            lines = lines.len(),
            "Sale recorded"
        );
        self.activity
            .log(
                Some(operator_id),
                &format!(
                    "Sale ticket #{} for {} ({})",
                    ticket_number,
                    total,
                    payment_method.as_str()
                ),
            )
            .await;

        Ok(SaleReceipt {
            sale_id,
            ticket_number,
            total,
            payment_method,
            lines,
        })
    }

    /// Reverse a sale and put its weight back on the shelf
    pub async fn cancel_sale(
        &self,
        ticket_number: i64,
        operator_id: i64,
        reason: &str,
    ) -> AppResult<SaleReversal> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::validation("reason", "A reason is required"));
        }

        let mut tx = self.store.begin_write().await?;
        let sale = fetch_sale_by_ticket(&mut tx, ticket_number).await?;
        if sale.reversed {
            return Err(AppError::Conflict(format!(
                "Sale ticket #{} is already cancelled",
                ticket_number
            )));
        }

        let now = Utc::now();
        let reversal_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO sale_reversals (sale_id, operator_id, created_at, reason)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(sale.id)
        .bind(operator_id)
        .bind(to_millis(now))
        .bind(reason)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match AppError::unique_or_storage(e, "sale reversal") {
            AppError::DuplicateKey(_) => AppError::Conflict(format!(
                "Sale ticket #{} is already cancelled",
                ticket_number
            )),
            other => other,
        })?;

        for line in fetch_lines(&mut tx, sale.id).await? {
            apply_stock_delta(&mut tx, line.product_id, line.weight, StockDirection::Increase)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(ticket_number, operator_id, "Sale cancelled");
        self.activity
            .log(
                Some(operator_id),
                &format!(
                    "Cancelled sale ticket #{} ({}): {}",
                    ticket_number, sale.total, reason
                ),
            )
            .await;

        Ok(SaleReversal {
            id: reversal_id,
            sale_id: sale.id,
            operator_id,
            created_at: now,
            reason: reason.to_string(),
        })
    }

    pub async fn get_sale(&self, ticket_number: i64) -> AppResult<SaleDetail> {
        let mut conn = self.store.pool().acquire().await?;
        let sale = fetch_sale_by_ticket(&mut conn, ticket_number).await?;
        let lines = fetch_lines(&mut conn, sale.id).await?;
        Ok(SaleDetail { sale, lines })
    }

    /// Sales in a local date range, newest first, reversed ones included
    pub async fn list_sales(&self, range: &DateRange) -> AppResult<Vec<Sale>> {
        let (start, end) = range_bounds_millis(range);
        let rows = sqlx::query_as::<_, SaleRow>(&format!(
            "{} WHERE s.created_at >= ? AND s.created_at < ? ORDER BY s.ticket_number DESC",
            SALE_SELECT
        ))
        .bind(start)
        .bind(end)
        .fetch_all(self.store.pool())
        .await?;
        rows.into_iter().map(Sale::try_from).collect()
    }
}
