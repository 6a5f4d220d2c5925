//! Half-carcass intake and butchering service

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};

use crate::db::{from_millis, stored_weight, to_millis, Store};
use crate::error::{ensure_valid, AppError, AppResult};
use crate::services::activity::ActivityLog;
use crate::services::stock::apply_stock_delta;
use shared::models::{apply_allocation, BulkUnit, ButcherRecord, StockDirection};
use shared::types::{Money, Weight};
use shared::validation::{validate_non_negative_money, validate_positive_weight, validate_supplier};

/// Butcher service
#[derive(Clone)]
pub struct ButcherService {
    store: Store,
    activity: ActivityLog,
}

/// Input for receiving a half carcass
#[derive(Debug, Deserialize)]
pub struct RegisterBulkUnitInput {
    pub initial_weight: Weight,
    pub cost: Money,
    pub supplier: String,
}

/// Weight of a bulk unit going to one product
#[derive(Debug, Clone, Deserialize)]
pub struct AllocationInput {
    pub product_id: i64,
    pub weight: Weight,
}

#[derive(Debug, Deserialize)]
pub struct ButcherInput {
    pub allocations: Vec<AllocationInput>,
}

/// Result of a butchering session
#[derive(Debug, Clone, Serialize)]
pub struct ButcherOutcome {
    pub bulk_unit: BulkUnit,
    pub records: Vec<ButcherRecord>,
}

/// A bulk unit with everything cut from it so far
#[derive(Debug, Clone, Serialize)]
pub struct BulkUnitDetail {
    #[serde(flatten)]
    pub bulk_unit: BulkUnit,
    pub remaining: Weight,
    pub yield_percent: rust_decimal::Decimal,
    pub records: Vec<ButcherRecord>,
}

#[derive(Debug, FromRow)]
struct BulkUnitRow {
    id: i64,
    arrived_at: i64,
    initial_weight_grams: i64,
    cost_cents: i64,
    supplier: String,
    processed_grams: i64,
    waste_grams: i64,
}

impl TryFrom<BulkUnitRow> for BulkUnit {
    type Error = AppError;

    fn try_from(row: BulkUnitRow) -> AppResult<Self> {
        Ok(BulkUnit {
            id: row.id,
            arrived_at: from_millis(row.arrived_at),
            initial_weight: stored_weight(row.initial_weight_grams)?,
            cost: Money::from_cents(row.cost_cents),
            supplier: row.supplier,
            weight_processed: stored_weight(row.processed_grams)?,
            waste: stored_weight(row.waste_grams)?,
        })
    }
}

#[derive(Debug, FromRow)]
struct ButcherRecordRow {
    id: i64,
    bulk_unit_id: i64,
    product_id: i64,
    weight_grams: i64,
    created_at: i64,
    operator_id: i64,
}

impl TryFrom<ButcherRecordRow> for ButcherRecord {
    type Error = AppError;

    fn try_from(row: ButcherRecordRow) -> AppResult<Self> {
        Ok(ButcherRecord {
            id: row.id,
            bulk_unit_id: row.bulk_unit_id,
            product_id: row.product_id,
            weight: stored_weight(row.weight_grams)?,
            created_at: from_millis(row.created_at),
            operator_id: row.operator_id,
        })
    }
}

const BULK_UNIT_COLUMNS: &str =
    "id, arrived_at, initial_weight_grams, cost_cents, supplier, processed_grams, waste_grams";

async fn fetch_bulk_unit(conn: &mut SqliteConnection, id: i64) -> AppResult<BulkUnit> {
    sqlx::query_as::<_, BulkUnitRow>(&format!(
        "SELECT {} FROM bulk_units WHERE id = ?",
        BULK_UNIT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Bulk unit {}", id)))?
    .try_into()
}

impl ButcherService {
    pub fn new(store: Store, activity: ActivityLog) -> Self {
        Self { store, activity }
    }

    /// Record the arrival of a half carcass
    pub async fn register_bulk_unit(
        &self,
        input: RegisterBulkUnitInput,
        operator_id: i64,
    ) -> AppResult<BulkUnit> {
        ensure_valid("initial_weight", validate_positive_weight(input.initial_weight))?;
        ensure_valid("cost", validate_non_negative_money(input.cost))?;
        let supplier = input.supplier.trim().to_string();
        ensure_valid("supplier", validate_supplier(&supplier))?;

        let mut tx = self.store.begin_write().await?;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO bulk_units
                (arrived_at, initial_weight_grams, cost_cents, supplier, processed_grams, waste_grams)
            VALUES (?, ?, ?, ?, 0, ?)
            RETURNING id
            "#,
        )
        .bind(to_millis(Utc::now()))
        .bind(input.initial_weight.grams())
        .bind(input.cost.cents())
        .bind(&supplier)
        .bind(input.initial_weight.grams())
        .fetch_one(&mut *tx)
        .await?;
        let unit = fetch_bulk_unit(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(bulk_unit_id = id, weight = %unit.initial_weight, "Bulk unit registered");
        self.activity
            .log(
                Some(operator_id),
                &format!(
                    "Received half carcass #{} of {} from {}",
                    id, unit.initial_weight, supplier
                ),
            )
            .await;

        Ok(unit)
    }

    /// Apportion pieces of a bulk unit into product stock
    pub async fn butcher(
        &self,
        bulk_unit_id: i64,
        allocations: &[AllocationInput],
        operator_id: i64,
    ) -> AppResult<ButcherOutcome> {
        if allocations.is_empty() {
            return Err(AppError::validation("allocations", "No cuts to allocate"));
        }
        for allocation in allocations {
            ensure_valid("weight", validate_positive_weight(allocation.weight))?;
        }
        let requested = allocations
            .iter()
            .try_fold(Weight::ZERO, |acc, a| acc.checked_add(a.weight))
            .ok_or_else(|| AppError::validation("allocations", "Total weight out of range"))?;

        let mut tx = self.store.begin_write().await?;
        let unit = fetch_bulk_unit(&mut tx, bulk_unit_id).await?;

        let (processed, waste) =
            apply_allocation(unit.initial_weight, unit.weight_processed, requested).ok_or_else(
                || {
                    tracing::warn!(bulk_unit_id, requested = %requested, "Butchering rejected");
                    AppError::Overallocation {
                        bulk_unit_id,
                        requested,
                        remaining: unit.remaining(),
                    }
                },
            )?;

        let now = to_millis(Utc::now());
        let mut records = Vec::with_capacity(allocations.len());
        for allocation in allocations {
            apply_stock_delta(
                &mut tx,
                allocation.product_id,
                allocation.weight,
                StockDirection::Increase,
            )
            .await?;

            let record_id: i64 = sqlx::query_scalar(
                r#"
                INSERT INTO butcher_records
                    (bulk_unit_id, product_id, weight_grams, created_at, operator_id)
                VALUES (?, ?, ?, ?, ?)
                RETURNING id
                "#,
            )
            .bind(bulk_unit_id)
            .bind(allocation.product_id)
            .bind(allocation.weight.grams())
            .bind(now)
            .bind(operator_id)
            .fetch_one(&mut *tx)
            .await?;

            records.push(ButcherRecord {
                id: record_id,
                bulk_unit_id,
                product_id: allocation.product_id,
                weight: allocation.weight,
                created_at: from_millis(now),
                operator_id,
            });
        }

        sqlx::query("UPDATE bulk_units SET processed_grams = ?, waste_grams = ? WHERE id = ?")
            .bind(processed.grams())
            .bind(waste.grams())
            .bind(bulk_unit_id)
            .execute(&mut *tx)
            .await?;
        let bulk_unit = fetch_bulk_unit(&mut tx, bulk_unit_id).await?;
        tx.commit().await?;

        tracing::info!(
            bulk_unit_id,
            allocated = %requested,
            processed = %processed,
            waste = %waste,
            "Bulk unit butchered"
        );
        self.activity
            .log(
                Some(operator_id),
                &format!(
                    "Butchered {} from half carcass #{} into {} cuts, waste now {}",
                    requested,
                    bulk_unit_id,
                    records.len(),
                    waste
                ),
            )
            .await;

        Ok(ButcherOutcome { bulk_unit, records })
    }

    pub async fn get_bulk_unit(&self, id: i64) -> AppResult<BulkUnitDetail> {
        let mut conn = self.store.pool().acquire().await?;
        let bulk_unit = fetch_bulk_unit(&mut conn, id).await?;
        let rows = sqlx::query_as::<_, ButcherRecordRow>(
            r#"
            SELECT id, bulk_unit_id, product_id, weight_grams, created_at, operator_id
            FROM butcher_records
            WHERE bulk_unit_id = ?
            ORDER BY id
            "#,
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await?;
        let records = rows
            .into_iter()
            .map(ButcherRecord::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(BulkUnitDetail {
            remaining: bulk_unit.remaining(),
            yield_percent: bulk_unit.yield_percent(),
            bulk_unit,
            records,
        })
    }

    /// All bulk units, newest first
    pub async fn list_bulk_units(&self) -> AppResult<Vec<BulkUnit>> {
        let rows = sqlx::query_as::<_, BulkUnitRow>(&format!(
            "SELECT {} FROM bulk_units ORDER BY arrived_at DESC, id DESC",
            BULK_UNIT_COLUMNS
        ))
        .fetch_all(self.store.pool())
        .await?;
        rows.into_iter().map(BulkUnit::try_from).collect()
    }

    /// Bulk units with weight left to butcher
    pub async fn available_bulk_units(&self) -> AppResult<Vec<BulkUnit>> {
        let rows = sqlx::query_as::<_, BulkUnitRow>(&format!(
            "SELECT {} FROM bulk_units WHERE processed_grams < initial_weight_grams \
             ORDER BY arrived_at, id",
            BULK_UNIT_COLUMNS
        ))
        .fetch_all(self.store.pool())
        .await?;
        rows.into_iter().map(BulkUnit::try_from).collect()
    }
}
