//! Business logic services for the Butcher Shop Ledger

pub mod activity;
pub mod auth;
pub mod butcher;
pub mod reporting;
pub mod sale;
pub mod shift;
pub mod stock;

pub use activity::ActivityLog;
pub use auth::AuthService;
pub use butcher::ButcherService;
pub use reporting::ReportingService;
pub use sale::SaleService;
pub use shift::ShiftService;
pub use stock::StockService;
