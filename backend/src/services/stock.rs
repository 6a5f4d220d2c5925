//! Stock ledger service: product catalogue, categories and weight on hand

use chrono::{Local, NaiveDate};
use serde::Deserialize;
use sqlx::{FromRow, SqliteConnection};
use validator::Validate;

use crate::db::{stored_weight, Store};
use crate::error::{ensure_valid, AppError, AppResult};
use crate::services::activity::ActivityLog;
use shared::models::{
    Category, Product, StockDirection, DEFAULT_FRESHNESS_DAYS, DEFAULT_MIN_STOCK_GRAMS,
};
use shared::types::{Money, Weight};
use shared::validation::{
    validate_freshness_days, validate_name, validate_non_negative_money,
    validate_positive_weight, validate_product_code,
};

const PRODUCT_COLUMNS: &str = "id, code, name, price_per_kg_cents, stock_grams, min_stock_grams, \
     category_id, intake_date, freshness_days, is_active";

/// Stock service for the product catalogue and stock movements
#[derive(Clone)]
pub struct StockService {
    store: Store,
    activity: ActivityLog,
}

/// Input for creating a product
#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 16))]
    pub code: String,
    #[validate(length(min = 1, max = 80))]
    pub name: String,
    pub price_per_kg: Money,
    pub min_stock: Option<Weight>,
    pub category_id: Option<i64>,
    pub freshness_days: Option<u32>,
}

#[derive(Debug, FromRow)]
pub(crate) struct ProductRow {
    id: i64,
    code: String,
    name: String,
    price_per_kg_cents: i64,
    stock_grams: i64,
    min_stock_grams: i64,
    category_id: Option<i64>,
    intake_date: NaiveDate,
    freshness_days: i64,
    is_active: bool,
}

impl TryFrom<ProductRow> for Product {
    type Error = AppError;

    fn try_from(row: ProductRow) -> AppResult<Self> {
        Ok(Product {
            id: row.id,
            code: row.code,
            name: row.name,
            price_per_kg: Money::from_cents(row.price_per_kg_cents),
            stock: stored_weight(row.stock_grams)?,
            min_stock: stored_weight(row.min_stock_grams)?,
            category_id: row.category_id,
            intake_date: row.intake_date,
            freshness_days: u32::try_from(row.freshness_days).unwrap_or(DEFAULT_FRESHNESS_DAYS),
            is_active: row.is_active,
        })
    }
}

#[derive(Debug, FromRow)]
struct CategoryRow {
    id: i64,
    name: String,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
        }
    }
}

fn into_products(rows: Vec<ProductRow>) -> AppResult<Vec<Product>> {
    rows.into_iter().map(Product::try_from).collect()
}

/// Load a product inside an open connection or transaction
pub(crate) async fn fetch_product(conn: &mut SqliteConnection, id: i64) -> AppResult<Product> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {} FROM products WHERE id = ?",
        PRODUCT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Product {}", id)))?;
    row.try_into()
}

/// Move `delta` grams into or out of a product's stock.
///
/// Runs inside the caller's transaction and does not commit. Decreases larger
/// than the stock on hand fail with `InsufficientStock` before any write.
/// Returns the new stock level.
pub async fn apply_stock_delta(
    conn: &mut SqliteConnection,
    product_id: i64,
    delta: Weight,
    direction: StockDirection,
) -> AppResult<Weight> {
    ensure_valid("weight", validate_positive_weight(delta))?;

    let (name, stock_grams): (String, i64) =
        sqlx::query_as("SELECT name, stock_grams FROM products WHERE id = ?")
            .bind(product_id)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Product {}", product_id)))?;
    let stock = stored_weight(stock_grams)?;

    let new_stock = match direction {
        StockDirection::Increase => stock
            .checked_add(delta)
            .ok_or_else(|| AppError::validation("weight", "Stock level out of range"))?,
        StockDirection::Decrease => {
            stock
                .checked_sub(delta)
                .ok_or_else(|| AppError::InsufficientStock {
                    product: name,
                    requested: delta,
                    available: stock,
                })?
        }
    };

    sqlx::query("UPDATE products SET stock_grams = ? WHERE id = ?")
        .bind(new_stock.grams())
        .bind(product_id)
        .execute(&mut *conn)
        .await?;

    Ok(new_stock)
}

impl StockService {
    pub fn new(store: Store, activity: ActivityLog) -> Self {
        Self { store, activity }
    }

    /// Manual stock correction, committed on its own
    pub async fn adjust_stock(
        &self,
        product_id: i64,
        delta: Weight,
        direction: StockDirection,
        operator_id: i64,
    ) -> AppResult<Product> {
        ensure_valid("weight", validate_positive_weight(delta))?;

        let mut tx = self.store.begin_write().await?;
        let new_stock = apply_stock_delta(&mut tx, product_id, delta, direction).await?;
        let product = fetch_product(&mut tx, product_id).await?;
        tx.commit().await?;

        tracing::info!(
            product_id,
            direction = direction.as_str(),
            delta = %delta,
            stock = %new_stock,
            "Stock adjusted"
        );
        self.activity
            .log(
                Some(operator_id),
                &format!(
                    "Stock {} of {} for {} ({}), now {}",
                    direction.as_str(),
                    delta,
                    product.name,
                    product.code,
                    new_stock
                ),
            )
            .await;

        Ok(product)
    }

    /// Create a product with zero stock and today's intake date
    pub async fn create_product(
        &self,
        input: CreateProductInput,
        operator_id: i64,
    ) -> AppResult<Product> {
        input.validate()?;
        let code = input.code.trim().to_string();
        let name = input.name.trim().to_string();
        ensure_valid("code", validate_product_code(&code))?;
        ensure_valid("name", validate_name(&name))?;
        ensure_valid("price_per_kg", validate_non_negative_money(input.price_per_kg))?;
        let freshness_days = input.freshness_days.unwrap_or(DEFAULT_FRESHNESS_DAYS);
        ensure_valid("freshness_days", validate_freshness_days(freshness_days))?;
        let min_stock = match input.min_stock {
            Some(weight) => weight,
            None => Weight::from_grams(DEFAULT_MIN_STOCK_GRAMS)?,
        };
        let today = Local::now().date_naive();

        let mut tx = self.store.begin_write().await?;

        if let Some(category_id) = input.category_id {
            let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM categories WHERE id = ?")
                .bind(category_id)
                .fetch_optional(&mut *tx)
                .await?;
            if exists.is_none() {
                return Err(AppError::NotFound(format!("Category {}", category_id)));
            }
        }

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO products
                (code, name, price_per_kg_cents, stock_grams, min_stock_grams,
                 category_id, intake_date, freshness_days, is_active)
            VALUES (?, ?, ?, 0, ?, ?, ?, ?, 1)
            RETURNING id
            "#,
        )
        .bind(&code)
        .bind(&name)
        .bind(input.price_per_kg.cents())
        .bind(min_stock.grams())
        .bind(input.category_id)
        .bind(today)
        .bind(i64::from(freshness_days))
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::unique_or_storage(e, "product code or name"))?;

        let product = fetch_product(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(product_id = id, code = %code, "Product created");
        self.activity
            .log(
                Some(operator_id),
                &format!("Created product {} ({})", name, code),
            )
            .await;

        Ok(product)
    }

    pub async fn get_product(&self, id: i64) -> AppResult<Product> {
        let mut conn = self.store.pool().acquire().await?;
        fetch_product(&mut conn, id).await
    }

    pub async fn list_products(&self, include_inactive: bool) -> AppResult<Vec<Product>> {
        let sql = if include_inactive {
            format!("SELECT {} FROM products ORDER BY name", PRODUCT_COLUMNS)
        } else {
            format!(
                "SELECT {} FROM products WHERE is_active = 1 ORDER BY name",
                PRODUCT_COLUMNS
            )
        };
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(self.store.pool())
            .await?;
        into_products(rows)
    }

    /// Exact code match first, then a case-insensitive name match
    pub async fn search_product(&self, term: &str) -> AppResult<Option<Product>> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(None);
        }

        let by_code = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE code = ? AND is_active = 1",
            PRODUCT_COLUMNS
        ))
        .bind(term)
        .fetch_optional(self.store.pool())
        .await?;
        if let Some(row) = by_code {
            return Ok(Some(row.try_into()?));
        }

        let pattern = format!(
            "%{}%",
            term.replace('\\', "\\\\")
                .replace('%', "\\%")
                .replace('_', "\\_")
        );
        let by_name = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products \
             WHERE is_active = 1 AND name LIKE ? ESCAPE '\\' \
             ORDER BY name LIMIT 1",
            PRODUCT_COLUMNS
        ))
        .bind(pattern)
        .fetch_optional(self.store.pool())
        .await?;

        by_name.map(Product::try_from).transpose()
    }

    pub async fn update_price(&self, id: i64, price: Money, operator_id: i64) -> AppResult<Product> {
        ensure_valid("price_per_kg", validate_non_negative_money(price))?;

        let mut tx = self.store.begin_write().await?;
        let before = fetch_product(&mut tx, id).await?;
        sqlx::query("UPDATE products SET price_per_kg_cents = ? WHERE id = ?")
            .bind(price.cents())
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let product = fetch_product(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(product_id = id, price = %price, "Price updated");
        self.activity
            .log(
                Some(operator_id),
                &format!(
                    "Price of {} changed from {} to {}",
                    product.name, before.price_per_kg, price
                ),
            )
            .await;

        Ok(product)
    }

    /// Products are never deleted, only hidden from the counter
    pub async fn deactivate_product(&self, id: i64, operator_id: i64) -> AppResult<Product> {
        let mut tx = self.store.begin_write().await?;
        fetch_product(&mut tx, id).await?;
        sqlx::query("UPDATE products SET is_active = 0 WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let product = fetch_product(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(product_id = id, "Product deactivated");
        self.activity
            .log(
                Some(operator_id),
                &format!("Deactivated product {} ({})", product.name, product.code),
            )
            .await;

        Ok(product)
    }

    /// Active products with `0 < stock <= minimum`
    pub async fn low_stock_products(&self) -> AppResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products \
             WHERE is_active = 1 AND stock_grams > 0 AND stock_grams <= min_stock_grams \
             ORDER BY name",
            PRODUCT_COLUMNS
        ))
        .fetch_all(self.store.pool())
        .await?;
        into_products(rows)
    }

    /// Active products with stock that expire within the near-expiry window
    pub async fn expiring_products(&self, today: NaiveDate) -> AppResult<Vec<Product>> {
        let mut products: Vec<Product> = self
            .list_products(false)
            .await?
            .into_iter()
            .filter(|p| !p.stock.is_zero() && p.is_near_expiry(today))
            .collect();
        products.sort_by_key(|p| p.expiry_date());
        Ok(products)
    }

    pub async fn create_category(&self, name: &str) -> AppResult<Category> {
        let name = name.trim();
        ensure_valid("name", validate_name(name))?;

        let mut tx = self.store.begin_write().await?;
        let id: i64 = sqlx::query_scalar("INSERT INTO categories (name) VALUES (?) RETURNING id")
            .bind(name)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| AppError::unique_or_storage(e, "category name"))?;
        tx.commit().await?;

        tracing::info!(category_id = id, name, "Category created");
        Ok(Category {
            id,
            name: name.to_string(),
        })
    }

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>("SELECT id, name FROM categories ORDER BY name")
            .fetch_all(self.store.pool())
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
