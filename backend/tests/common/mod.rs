//! Shared fixtures for the integration tests

#![allow(dead_code)]

use rust_decimal::Decimal;
use std::str::FromStr;
use tempfile::TempDir;

use butcher_backend::services::stock::CreateProductInput;
use butcher_backend::services::{
    ActivityLog, AuthService, ButcherService, ReportingService, SaleService, ShiftService,
    StockService,
};
use butcher_backend::{AppState, Config, Store};
use shared::models::{Product, StockDirection};
use shared::types::{Money, Weight};

/// Id of the seeded `admin` account
pub const ADMIN_ID: i64 = 1;

/// A freshly migrated and seeded database in a temporary directory
pub struct TestContext {
    pub dir: TempDir,
    pub config: Config,
    pub store: Store,
    pub activity: ActivityLog,
}

impl TestContext {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = Config::for_directory(dir.path());
        let store = Store::connect(&config.database).await.expect("connect");
        store.seed(&config.bootstrap).await.expect("seed");
        let activity = ActivityLog::new(store.clone(), &config.activity.fallback_path);
        Self {
            dir,
            config,
            store,
            activity,
        }
    }

    pub fn state(&self) -> AppState {
        AppState::new(self.store.clone(), self.config.clone())
    }

    pub fn stock(&self) -> StockService {
        StockService::new(self.store.clone(), self.activity.clone())
    }

    pub fn sales(&self) -> SaleService {
        SaleService::new(self.store.clone(), self.activity.clone())
    }

    pub fn butcher(&self) -> ButcherService {
        ButcherService::new(self.store.clone(), self.activity.clone())
    }

    pub fn shifts(&self) -> ShiftService {
        ShiftService::new(self.store.clone(), self.activity.clone())
    }

    pub fn auth(&self) -> AuthService {
        AuthService::new(self.store.clone(), self.activity.clone(), &self.config)
    }

    pub fn reports(&self) -> ReportingService {
        ReportingService::new(self.store.clone())
    }

    /// Create a product priced per kg (currency units) holding `stock_kg`
    pub async fn product(&self, code: &str, name: &str, price: &str, stock_kg: &str) -> Product {
        let product = self
            .stock()
            .create_product(
                CreateProductInput {
                    code: code.to_string(),
                    name: name.to_string(),
                    price_per_kg: money(price),
                    min_stock: None,
                    category_id: None,
                    freshness_days: None,
                },
                ADMIN_ID,
            )
            .await
            .expect("create product");

        let stock = kg(stock_kg);
        if stock.is_zero() {
            return product;
        }
        self.stock()
            .adjust_stock(product.id, stock, StockDirection::Increase, ADMIN_ID)
            .await
            .expect("stock product")
    }
}

pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn kg(s: &str) -> Weight {
    Weight::from_kg(dec(s)).unwrap()
}

pub fn money(s: &str) -> Money {
    Money::from_amount(dec(s)).unwrap()
}
