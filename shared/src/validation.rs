//! Validation utilities for farm inventory input

use rust_decimal::Decimal;
use validator::ValidationError;

use crate::error::InventoryError;
use crate::models::max_quantity;

// ============================================================================
// Quantity Validations
// ============================================================================

/// Quantities moved by a transaction must be strictly positive
pub fn validate_positive_quantity(field: &str, quantity: Decimal) -> Result<(), InventoryError> {
    if quantity <= Decimal::ZERO {
        return Err(InventoryError::validation(field, "Quantity must be positive"));
    }
    Ok(())
}

/// Eggs, sacks and chickens are counted, never split
pub fn validate_whole_units(field: &str, quantity: Decimal) -> Result<(), InventoryError> {
    if quantity != quantity.trunc() {
        return Err(InventoryError::validation(
            field,
            "Quantity must be a whole number",
        ));
    }
    Ok(())
}

/// Decimal places beyond `max_scale` would be silently rounded by the
/// database, so they are refused instead. Trailing zeros do not count.
pub fn validate_max_scale(field: &str, value: Decimal, max_scale: u32) -> Result<(), InventoryError> {
    if value.normalize().scale() > max_scale {
        return Err(InventoryError::validation(
            field,
            format!("At most {} decimal places are allowed", max_scale),
        ));
    }
    Ok(())
}

pub fn validate_quantity_range(field: &str, quantity: Decimal) -> Result<(), InventoryError> {
    if quantity > max_quantity() {
        return Err(InventoryError::validation(field, "Quantity is too large"));
    }
    Ok(())
}

/// `validator` hook for positive decimal input fields
pub fn positive_decimal(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        let mut error = ValidationError::new("positive");
        error.message = Some("must be greater than zero".into());
        return Err(error);
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Phone numbers are the login identity: digits with an optional leading +,
/// 9 to 15 digits long
pub fn validate_phone_number(phone: &str) -> Result<(), ValidationError> {
    let rest = phone.strip_prefix('+').unwrap_or(phone);
    let digits = rest.chars().filter(|c| !matches!(c, ' ' | '-')).collect::<String>();

    if !digits.chars().all(|c| c.is_ascii_digit()) || !(9..=15).contains(&digits.len()) {
        let mut error = ValidationError::new("phone_number");
        error.message = Some("Invalid phone number format".into());
        return Err(error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn zero_and_negative_quantities_are_rejected() {
        assert!(validate_positive_quantity("quantity", dec("0")).is_err());
        assert!(validate_positive_quantity("quantity", dec("-1")).is_err());
        assert!(validate_positive_quantity("quantity", dec("0.25")).is_ok());
    }

    #[test]
    fn fractional_counts_are_rejected() {
        assert!(validate_whole_units("quantity", dec("4")).is_ok());
        assert!(validate_whole_units("quantity", dec("4.00")).is_ok());
        assert!(validate_whole_units("quantity", dec("4.5")).is_err());
    }

    #[test]
    fn scale_beyond_two_places_is_rejected() {
        assert!(validate_max_scale("quantity", dec("1.25"), 2).is_ok());
        assert!(validate_max_scale("quantity", dec("1.2500"), 2).is_ok());
        assert!(validate_max_scale("quantity", dec("1.005"), 2).is_err());
        assert!(validate_max_scale("quantity", dec("0.004"), 2).is_err());
    }

    #[test]
    fn quantities_must_fit_the_ledger_columns() {
        assert!(validate_quantity_range("quantity", dec("999999999999.99")).is_ok());
        assert!(validate_quantity_range("quantity", dec("1000000000000")).is_err());
    }

    #[test]
    fn phone_numbers() {
        assert!(validate_phone_number("+255 712 345 678").is_ok());
        assert!(validate_phone_number("0712345678").is_ok());
        assert!(validate_phone_number("07123").is_err());
        assert!(validate_phone_number("07123abc45").is_err());
    }

    #[test]
    fn positive_decimal_hook() {
        assert!(positive_decimal(&dec("1.5")).is_ok());
        assert!(positive_decimal(&dec("0")).is_err());
    }
}
