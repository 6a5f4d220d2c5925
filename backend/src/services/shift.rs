//! Shift ledger service: opening the drawer and end-of-shift cash count

use chrono::{Local, NaiveDate, Utc};
use serde::Deserialize;
use sqlx::{FromRow, SqliteConnection};

use crate::db::{from_millis, to_millis, Store};
use crate::error::{ensure_valid, AppError, AppResult};
use crate::services::activity::ActivityLog;
use shared::models::{reconcile, PaymentMethod, PaymentTotals, Reconciliation, ReconciliationReport, Shift};
use shared::types::Money;
use shared::validation::{validate_non_negative_money, validate_shift_label};

/// Shift service
#[derive(Clone)]
pub struct ShiftService {
    store: Store,
    activity: ActivityLog,
}

#[derive(Debug, Deserialize)]
pub struct OpenShiftInput {
    pub label: String,
    pub starting_cash: Money,
}

#[derive(Debug, Deserialize)]
pub struct CloseShiftInput {
    pub counted_cash: Money,
}

#[derive(Debug, FromRow)]
struct ShiftRow {
    id: i64,
    operator_id: i64,
    shift_date: NaiveDate,
    label: String,
    started_at: i64,
    ended_at: Option<i64>,
    starting_cash_cents: i64,
    counted_cash_cents: Option<i64>,
    variance_cents: Option<i64>,
}

impl From<ShiftRow> for Shift {
    fn from(row: ShiftRow) -> Self {
        Shift {
            id: row.id,
            operator_id: row.operator_id,
            date: row.shift_date,
            label: row.label,
            started_at: from_millis(row.started_at),
            ended_at: row.ended_at.map(from_millis),
            starting_cash: Money::from_cents(row.starting_cash_cents),
            counted_cash: row.counted_cash_cents.map(Money::from_cents),
            variance: row.variance_cents.map(Money::from_cents),
        }
    }
}

#[derive(Debug, FromRow)]
struct ReconciliationRow {
    id: i64,
    shift_id: i64,
    cash_sales_cents: i64,
    expected_cash_cents: i64,
    counted_cash_cents: i64,
    transfer_total_cents: i64,
    card_total_cents: i64,
    variance_cents: i64,
}

impl From<ReconciliationRow> for Reconciliation {
    fn from(row: ReconciliationRow) -> Self {
        Reconciliation {
            id: row.id,
            shift_id: row.shift_id,
            cash_sales: Money::from_cents(row.cash_sales_cents),
            expected_cash: Money::from_cents(row.expected_cash_cents),
            counted_cash: Money::from_cents(row.counted_cash_cents),
            transfer_total: Money::from_cents(row.transfer_total_cents),
            card_total: Money::from_cents(row.card_total_cents),
            variance: Money::from_cents(row.variance_cents),
        }
    }
}

const SHIFT_COLUMNS: &str = "id, operator_id, shift_date, label, started_at, ended_at, \
     starting_cash_cents, counted_cash_cents, variance_cents";

async fn fetch_shift(conn: &mut SqliteConnection, id: i64) -> AppResult<Shift> {
    let row = sqlx::query_as::<_, ShiftRow>(&format!(
        "SELECT {} FROM shifts WHERE id = ?",
        SHIFT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Shift {}", id)))?;
    Ok(row.into())
}

async fn fetch_open_shift(
    conn: &mut SqliteConnection,
    operator_id: i64,
) -> AppResult<Option<Shift>> {
    let row = sqlx::query_as::<_, ShiftRow>(&format!(
        "SELECT {} FROM shifts WHERE operator_id = ? AND ended_at IS NULL",
        SHIFT_COLUMNS
    ))
    .bind(operator_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.map(Into::into))
}

/// Non-reversed sales of one operator in `[start, end]`, per payment method
async fn payment_totals(
    conn: &mut SqliteConnection,
    operator_id: i64,
    start: i64,
    end: i64,
) -> AppResult<PaymentTotals> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT s.payment_method, COALESCE(SUM(s.total_cents), 0)
        FROM sales s
        WHERE s.operator_id = ?
          AND s.created_at >= ?
          AND s.created_at <= ?
          AND NOT EXISTS (SELECT 1 FROM sale_reversals r WHERE r.sale_id = s.id)
        GROUP BY s.payment_method
        "#,
    )
    .bind(operator_id)
    .bind(start)
    .bind(end)
    .fetch_all(&mut *conn)
    .await?;

    let mut totals = PaymentTotals::default();
    for (method, cents) in rows {
        let method = PaymentMethod::from_str(&method)
            .ok_or_else(|| AppError::Internal(format!("Unknown payment method {}", method)))?;
        totals.add(method, Money::from_cents(cents))?;
    }
    Ok(totals)
}

impl ShiftService {
    pub fn new(store: Store, activity: ActivityLog) -> Self {
        Self { store, activity }
    }

    /// Open a cash drawer; an operator has at most one open shift
    pub async fn open_shift(&self, operator_id: i64, input: OpenShiftInput) -> AppResult<Shift> {
        let label = input.label.trim().to_string();
        ensure_valid("label", validate_shift_label(&label))?;
        ensure_valid("starting_cash", validate_non_negative_money(input.starting_cash))?;

        let mut tx = self.store.begin_write().await?;

        if let Some(open) = fetch_open_shift(&mut tx, operator_id).await? {
            tracing::warn!(operator_id, shift_id = open.id, "Shift already open");
            return Err(AppError::Conflict(format!(
                "Operator already has open shift {}",
                open.id
            )));
        }

        let now = Utc::now();
        let today = now.with_timezone(&Local).date_naive();
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO shifts (operator_id, shift_date, label, started_at, starting_cash_cents)
            VALUES (?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(operator_id)
        .bind(today)
        .bind(&label)
        .bind(to_millis(now))
        .bind(input.starting_cash.cents())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match AppError::unique_or_storage(e, "open shift") {
            AppError::DuplicateKey(_) => {
                AppError::Conflict("Operator already has an open shift".to_string())
            }
            other => other,
        })?;

        let shift = fetch_shift(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(shift_id = id, operator_id, starting_cash = %input.starting_cash, "Shift opened");
        self.activity
            .log(
                Some(operator_id),
                &format!(
                    "Opened {} shift #{} with starting cash {}",
                    label, id, input.starting_cash
                ),
            )
            .await;

        Ok(shift)
    }

    /// Close a shift and reconcile the counted drawer against recorded sales
    pub async fn close_shift(
        &self,
        shift_id: i64,
        counted_cash: Money,
    ) -> AppResult<ReconciliationReport> {
        ensure_valid("counted_cash", validate_non_negative_money(counted_cash))?;

        let mut tx = self.store.begin_write().await?;
        let shift = fetch_shift(&mut tx, shift_id).await?;
        if !shift.is_open() {
            return Err(AppError::Conflict(format!("Shift {} is already closed", shift_id)));
        }

        let now = to_millis(Utc::now());
        let totals =
            payment_totals(&mut tx, shift.operator_id, to_millis(shift.started_at), now).await?;
        let (expected_cash, variance) = reconcile(shift.starting_cash, &totals, counted_cash)
            .map_err(|_| AppError::validation("counted_cash", "Drawer amounts are out of range"))?;

        sqlx::query(
            r#"
            UPDATE shifts
            SET ended_at = ?, counted_cash_cents = ?, variance_cents = ?
            WHERE id = ?
            "#,
        )
        .bind(now)
        .bind(counted_cash.cents())
        .bind(variance.cents())
        .bind(shift_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO reconciliations
                (shift_id, cash_sales_cents, expected_cash_cents, counted_cash_cents,
                 transfer_total_cents, card_total_cents, variance_cents)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(shift_id)
        .bind(totals.cash.cents())
        .bind(expected_cash.cents())
        .bind(counted_cash.cents())
        .bind(totals.transfer.cents())
        .bind(totals.card.cents())
        .bind(variance.cents())
        .execute(&mut *tx)
        .await
        .map_err(|e| match AppError::unique_or_storage(e, "reconciliation") {
            AppError::DuplicateKey(_) => {
                AppError::Conflict(format!("Shift {} is already reconciled", shift_id))
            }
            other => other,
        })?;

        tx.commit().await?;

        tracing::info!(
            shift_id,
            expected = %expected_cash,
            counted = %counted_cash,
            variance = %variance,
            "Shift closed"
        );
        self.activity
            .log(
                Some(shift.operator_id),
                &format!(
                    "Closed shift #{}: expected {}, counted {}, variance {}",
                    shift_id, expected_cash, counted_cash, variance
                ),
            )
            .await;

        Ok(ReconciliationReport {
            shift_id,
            starting_cash: shift.starting_cash,
            cash_sales: totals.cash,
            expected_cash,
            counted_cash,
            transfer_total: totals.transfer,
            card_total: totals.card,
            variance,
        })
    }

    pub async fn get_open_shift(&self, operator_id: i64) -> AppResult<Option<Shift>> {
        let mut conn = self.store.pool().acquire().await?;
        fetch_open_shift(&mut conn, operator_id).await
    }

    pub async fn get_shift(&self, id: i64) -> AppResult<Shift> {
        let mut conn = self.store.pool().acquire().await?;
        fetch_shift(&mut conn, id).await
    }

    pub async fn get_reconciliation(&self, shift_id: i64) -> AppResult<Reconciliation> {
        let row = sqlx::query_as::<_, ReconciliationRow>(
            r#"
            SELECT id, shift_id, cash_sales_cents, expected_cash_cents, counted_cash_cents,
                   transfer_total_cents, card_total_cents, variance_cents
            FROM reconciliations
            WHERE shift_id = ?
            "#,
        )
        .bind(shift_id)
        .fetch_optional(self.store.pool())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Reconciliation for shift {}", shift_id)))?;
        Ok(row.into())
    }
}
