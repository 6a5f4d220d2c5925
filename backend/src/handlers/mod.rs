//! HTTP request handlers

pub mod activity;
pub mod admin;
pub mod auth;
pub mod butcher;
pub mod health;
pub mod products;
pub mod reporting;
pub mod sales;
pub mod shifts;

pub use activity::*;
pub use admin::*;
pub use auth::*;
pub use butcher::*;
pub use health::*;
pub use products::*;
pub use reporting::*;
pub use sales::*;
pub use shifts::*;
