//! Validation of insert-time candidates.
//!
//! Candidates are the raw records a client submits (`NewUser`,
//! `NewProduct`, ...). They are checked here before any request is built, so
//! malformed input never reaches the network.

use rust_decimal::Decimal;

use crate::types::EmailError;

/// A rule violated by a candidate record.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required string field is empty or whitespace.
    #[error("{0} is required")]
    EmptyField(&'static str),

    /// A price field is negative.
    #[error("{field} cannot be negative (got {value})")]
    NegativePrice {
        /// Field name.
        field: &'static str,
        /// Rejected value.
        value: Decimal,
    },

    /// An inventory count is negative.
    #[error("inventory cannot be negative (got {0})")]
    NegativeInventory(i32),

    /// A quantity is below one.
    #[error("quantity must be at least 1 (got {0})")]
    InvalidQuantity(i64),

    /// The email address is malformed.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),
}

/// Types that can check their own domain constraints.
pub trait Validate {
    /// Check every constraint, returning the first violation.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Require a non-blank string.
pub(crate) fn require_non_empty(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    Ok(())
}

/// Require a non-negative decimal amount.
pub(crate) fn require_non_negative(
    field: &'static str,
    value: Decimal,
) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::NegativePrice { field, value });
    }
    Ok(())
}

/// Require a quantity of at least one.
pub(crate) fn require_quantity(value: i64) -> Result<(), ValidationError> {
    if value < 1 {
        return Err(ValidationError::InvalidQuantity(value));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ValidationError::EmptyField("username").to_string(),
            "username is required"
        );
        assert_eq!(
            ValidationError::InvalidQuantity(0).to_string(),
            "quantity must be at least 1 (got 0)"
        );
    }

    #[test]
    fn test_require_non_empty_rejects_whitespace() {
        assert!(require_non_empty("name", "   ").is_err());
        assert!(require_non_empty("name", "Mug").is_ok());
    }

    #[test]
    fn test_require_non_negative() {
        assert!(require_non_negative("price", Decimal::new(-1, 0)).is_err());
        assert!(require_non_negative("price", Decimal::ZERO).is_ok());
    }
}
