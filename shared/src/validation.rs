//! Validation utilities for the Butcher Shop Ledger
//!
//! Plain functions shared by the backend services and any client that wants
//! to reject bad input before it reaches the till.

use crate::types::{Money, Weight};

pub const MAX_PRODUCT_CODE_LEN: usize = 16;
pub const MAX_NAME_LEN: usize = 80;
pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 32;
pub const MIN_PASSWORD_LEN: usize = 6;
pub const MAX_FRESHNESS_DAYS: u32 = 365;

// ============================================================================
// Catalogue Validations
// ============================================================================

/// Validate a scale code: 1-16 characters, alphanumeric, `-` or `_`
pub fn validate_product_code(code: &str) -> Result<(), &'static str> {
    if code.is_empty() {
        return Err("Product code is required");
    }
    if code.chars().count() > MAX_PRODUCT_CODE_LEN {
        return Err("Product code must be at most 16 characters");
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err("Product code may only contain letters, digits, '-' and '_'");
    }
    Ok(())
}

/// Validate a product or category name
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name is required");
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err("Name must be at most 80 characters");
    }
    Ok(())
}

pub fn validate_freshness_days(days: u32) -> Result<(), &'static str> {
    if days == 0 || days > MAX_FRESHNESS_DAYS {
        return Err("Freshness window must be between 1 and 365 days");
    }
    Ok(())
}

// ============================================================================
// Ledger Validations
// ============================================================================

/// Weights moved through the ledger must be strictly positive
pub fn validate_positive_weight(weight: Weight) -> Result<(), &'static str> {
    if weight.is_zero() {
        return Err("Weight must be greater than zero");
    }
    Ok(())
}

/// Prices, costs and cash counts may be zero but never negative
pub fn validate_non_negative_money(amount: Money) -> Result<(), &'static str> {
    if amount.is_negative() {
        return Err("Amount cannot be negative");
    }
    Ok(())
}

pub fn validate_supplier(supplier: &str) -> Result<(), &'static str> {
    if supplier.trim().is_empty() {
        return Err("Supplier is required");
    }
    Ok(())
}

/// Validate a shift label such as "Morning" or "Afternoon"
pub fn validate_shift_label(label: &str) -> Result<(), &'static str> {
    if label.trim().is_empty() {
        return Err("Shift label is required");
    }
    if label.chars().count() > 32 {
        return Err("Shift label must be at most 32 characters");
    }
    Ok(())
}

// ============================================================================
// Account Validations
// ============================================================================

/// Validate a username: 3-32 characters from `[A-Za-z0-9._-]`
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    let len = username.chars().count();
    if len < MIN_USERNAME_LEN {
        return Err("Username must be at least 3 characters");
    }
    if len > MAX_USERNAME_LEN {
        return Err("Username must be at most 32 characters");
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '-')
    {
        return Err("Username may only contain letters, digits, '.', '_' and '-'");
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err("Password must be at least 6 characters");
    }
    Ok(())
}
