//! Shared types and models for the Butcher Shop Ledger
//!
//! This crate contains the domain records, fixed-point weight and money
//! types, and pure ledger arithmetic shared by the backend and any
//! presentation client.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
