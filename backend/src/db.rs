//! Database module
//!
//! Owns the SQLite pool, the single-writer lock, migrations, first-start
//! seeding and backups.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::{BootstrapConfig, DatabaseConfig};
use crate::error::{AppError, AppResult};
use shared::models::DEFAULT_FRESHNESS_DAYS;
use shared::types::{DateRange, Weight};

const DEFAULT_CATEGORIES: [&str; 4] = ["Beef", "Pork", "Poultry", "Offal"];

/// (name, code, price per kg in cents, minimum stock in grams)
const STARTER_CUTS: [(&str, &str, i64, i64); 5] = [
    ("Costillas", "C01", 150_000, 10_000),
    ("Matambre", "C02", 220_000, 10_000),
    ("Vacío", "C03", 250_000, 10_000),
    ("Carne Molida", "C04", 180_000, 15_000),
    ("Puchero", "C05", 80_000, 20_000),
];

/// Handle to the ledger database
///
/// Cloning is cheap; all clones share the pool and the writer lock.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    writer: Arc<Mutex<()>>,
}

/// A write transaction holding the single-writer lock
///
/// Dropping without [`WriteTx::commit`] rolls back and releases the lock.
pub struct WriteTx {
    // Field order matters: the transaction must end before the lock is released.
    tx: Transaction<'static, Sqlite>,
    _guard: OwnedMutexGuard<()>,
}

impl WriteTx {
    pub async fn commit(self) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

impl Deref for WriteTx {
    type Target = SqliteConnection;

    fn deref(&self) -> &Self::Target {
        &self.tx
    }
}

impl DerefMut for WriteTx {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.tx
    }
}

impl Store {
    /// Open (creating if missing) the database file and apply migrations
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", config.path))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await?;

        tracing::info!(path = %config.path, "Database connection established (SQLite WAL)");

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        Ok(Self {
            pool,
            writer: Arc::new(Mutex::new(())),
        })
    }

    /// Pool for read-only queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Take the writer lock and open a transaction
    pub async fn begin_write(&self) -> AppResult<WriteTx> {
        let guard = self.writer.clone().lock_owned().await;
        let tx = self.pool.begin().await?;
        Ok(WriteTx { tx, _guard: guard })
    }

    /// Seed the admin account and starter catalogue when no user exists yet
    pub async fn seed(&self, bootstrap: &BootstrapConfig) -> AppResult<bool> {
        let mut tx = self.begin_write().await?;

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *tx)
            .await?;
        if users > 0 {
            return Ok(false);
        }

        let password_hash = bcrypt::hash(&bootstrap.admin_password, bcrypt::DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;
        let now = to_millis(Utc::now());

        sqlx::query(
            "INSERT INTO users (username, password_hash, access_level, is_active, created_at) \
             VALUES ('admin', ?, 'admin', 1, ?)",
        )
        .bind(&password_hash)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if bootstrap.seed_catalog {
            for name in DEFAULT_CATEGORIES {
                sqlx::query("INSERT OR IGNORE INTO categories (name) VALUES (?)")
                    .bind(name)
                    .execute(&mut *tx)
                    .await?;
            }

            let beef_id: Option<i64> =
                sqlx::query_scalar("SELECT id FROM categories WHERE name = 'Beef'")
                    .fetch_optional(&mut *tx)
                    .await?;
            let today = Local::now().date_naive();

            for (name, code, price_cents, min_grams) in STARTER_CUTS {
                sqlx::query(
                    r#"
                    INSERT OR IGNORE INTO products
                        (code, name, price_per_kg_cents, stock_grams, min_stock_grams,
                         category_id, intake_date, freshness_days, is_active)
                    VALUES (?, ?, ?, 0, ?, ?, ?, ?, 1)
                    "#,
                )
                .bind(code)
                .bind(name)
                .bind(price_cents)
                .bind(min_grams)
                .bind(beef_id)
                .bind(today)
                .bind(i64::from(DEFAULT_FRESHNESS_DAYS))
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        tracing::info!(
            seed_catalog = bootstrap.seed_catalog,
            "Seeded empty database with admin account"
        );
        Ok(true)
    }

    /// Write a consistent copy of the database into `dir`
    pub async fn backup_to(&self, dir: &Path) -> AppResult<PathBuf> {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| AppError::Internal(format!("Cannot create backup directory: {}", e)))?;

        let file_name = format!(
            "butcher_backup_{}.db",
            Local::now().format("%Y-%m-%d_%H-%M-%S")
        );
        let target = dir.join(file_name);

        sqlx::query("VACUUM INTO ?")
            .bind(target.to_string_lossy().into_owned())
            .execute(&self.pool)
            .await?;

        tracing::info!(path = %target.display(), "Database backup written");
        Ok(target)
    }
}

/// Unix milliseconds, the storage format for timestamps
pub fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

pub fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default()
}

/// Start of a local calendar day as unix millis
pub fn local_day_start_millis(day: NaiveDate) -> i64 {
    let midnight: NaiveDateTime = day.and_hms_opt(0, 0, 0).unwrap_or_default();
    match Local.from_local_datetime(&midnight).earliest() {
        Some(local) => local.with_timezone(&Utc).timestamp_millis(),
        None => midnight.and_utc().timestamp_millis(),
    }
}

/// Half-open `[start, end)` millis bounds of an inclusive local date range
pub fn range_bounds_millis(range: &DateRange) -> (i64, i64) {
    let start = local_day_start_millis(range.start);
    let end = range
        .end
        .succ_opt()
        .map(local_day_start_millis)
        .unwrap_or(i64::MAX);
    (start, end)
}

/// Decode a stored gram count; the schema keeps these non-negative
pub fn stored_weight(grams: i64) -> AppResult<Weight> {
    Weight::from_grams(grams)
        .map_err(|_| AppError::Internal(format!("Stored weight is negative: {} g", grams)))
}
