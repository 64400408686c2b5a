use sqlx::types::BigDecimal;
use std::fmt;

pub const CURRENCY_LEN: usize = 3;
pub const DEFAULT_CURRENCY: &str = "INR";
pub const MESSAGE_MAX_LEN: usize = 2000;
pub const CASH_ADJUSTMENT_MAX_SCALE: i64 = 2;
/// Exclusive bound on |cash_adjustment|; matches NUMERIC(14,2).
pub const CASH_ADJUSTMENT_LIMIT: i64 = 1_000_000_000_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

pub fn sanitize_string(value: &str) -> String {
    value
        .chars()
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.chars().count() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

pub fn validate_enum(field: &'static str, value: &str, allowed: &[&str]) -> ValidationResult {
    if allowed.iter().all(|candidate| value != *candidate) {
        return Err(ValidationError::new(
            field,
            format!("must be one of: {}", allowed.join(", ")),
        ));
    }

    Ok(())
}

pub fn validate_id(field: &'static str, id: i64) -> ValidationResult {
    if id <= 0 {
        return Err(ValidationError::new(field, "must be a positive integer"));
    }

    Ok(())
}

/// Returns the upper-cased code, or the default when absent.
pub fn normalize_currency(currency: Option<&str>) -> Result<String, ValidationError> {
    let code = match currency.map(sanitize_string) {
        Some(code) if !code.is_empty() => code.to_ascii_uppercase(),
        _ => return Ok(DEFAULT_CURRENCY.to_string()),
    };

    if code.len() != CURRENCY_LEN || !code.chars().all(|ch| ch.is_ascii_uppercase()) {
        return Err(ValidationError::new(
            "currency",
            format!("must be {} ASCII letters", CURRENCY_LEN),
        ));
    }

    Ok(code)
}

pub fn validate_cash_adjustment(amount: &BigDecimal) -> ValidationResult {
    let (_, scale) = amount.normalized().as_bigint_and_exponent();
    if scale > CASH_ADJUSTMENT_MAX_SCALE {
        return Err(ValidationError::new(
            "cashAdjustment",
            format!("must have at most {} decimal places", CASH_ADJUSTMENT_MAX_SCALE),
        ));
    }

    if amount.abs() >= BigDecimal::from(CASH_ADJUSTMENT_LIMIT) {
        return Err(ValidationError::new("cashAdjustment", "is out of range"));
    }

    Ok(())
}

/// Empty messages collapse to `None`.
pub fn normalize_message(message: Option<&str>) -> Result<Option<String>, ValidationError> {
    let Some(raw) = message else {
        return Ok(None);
    };

    let cleaned = sanitize_string(raw);
    if cleaned.is_empty() {
        return Ok(None);
    }

    validate_max_len("message", &cleaned, MESSAGE_MAX_LEN)?;
    Ok(Some(cleaned))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(raw: &str) -> BigDecimal {
        BigDecimal::from_str(raw).expect("valid decimal")
    }

    #[test]
    fn validates_max_len() {
        assert!(validate_max_len("field", "abc", 3).is_ok());
        assert!(validate_max_len("field", "abcd", 3).is_err());
        assert!(validate_max_len("field", "äöü", 3).is_ok());
    }

    #[test]
    fn validates_enum_values() {
        assert!(validate_enum("role", "sent", &["sent", "received"]).is_ok());
        assert!(validate_enum("role", "both", &["sent", "received"]).is_err());
    }

    #[test]
    fn sanitizes_string() {
        assert_eq!(sanitize_string("  hello\tworld  "), "hello world");
        assert_eq!(sanitize_string(" \n "), "");
        assert_eq!(sanitize_string("ab\u{0000}cd\u{0007}"), "abcd");
    }

    #[test]
    fn validates_ids() {
        assert!(validate_id("fromListingId", 1).is_ok());
        assert!(validate_id("fromListingId", 0).is_err());
        assert!(validate_id("fromListingId", -4).is_err());
    }

    #[test]
    fn currency_defaults_and_normalizes() {
        assert_eq!(normalize_currency(None).unwrap(), "INR");
        assert_eq!(normalize_currency(Some("  ")).unwrap(), "INR");
        assert_eq!(normalize_currency(Some("usd")).unwrap(), "USD");
        assert!(normalize_currency(Some("US")).is_err());
        assert!(normalize_currency(Some("EURO")).is_err());
        assert!(normalize_currency(Some("U5D")).is_err());
    }

    #[test]
    fn cash_adjustment_allows_signed_cents() {
        assert!(validate_cash_adjustment(&dec("0")).is_ok());
        assert!(validate_cash_adjustment(&dec("500")).is_ok());
        assert!(validate_cash_adjustment(&dec("-250.75")).is_ok());
        assert!(validate_cash_adjustment(&dec("10.500")).is_ok());
    }

    #[test]
    fn cash_adjustment_rejects_sub_cent_and_huge_values() {
        assert!(validate_cash_adjustment(&dec("0.001")).is_err());
        assert!(validate_cash_adjustment(&dec("1000000000000")).is_err());
        assert!(validate_cash_adjustment(&dec("-1000000000000")).is_err());
    }

    #[test]
    fn message_is_trimmed_and_bounded() {
        assert_eq!(normalize_message(None).unwrap(), None);
        assert_eq!(normalize_message(Some("   ")).unwrap(), None);
        assert_eq!(
            normalize_message(Some("  swap\nmy flat ")).unwrap(),
            Some("swap my flat".to_string())
        );
        assert!(normalize_message(Some(&"x".repeat(MESSAGE_MAX_LEN + 1))).is_err());
    }
}
