// Request validation for screening operations

use crate::domain::Imo;
use crate::error::{AppError, Result};

const MAX_ACCOUNT_ID_LEN: usize = 128;

pub fn validate_account_id(account_id: &str) -> Result<()> {
    if account_id.trim().is_empty() {
        return Err(AppError::Validation("account_id cannot be empty".to_string()));
    }
    if account_id.len() > MAX_ACCOUNT_ID_LEN {
        return Err(AppError::Validation(format!(
            "account_id too long (max {} chars)",
            MAX_ACCOUNT_ID_LEN
        )));
    }
    if account_id.chars().any(char::is_control) {
        return Err(AppError::Validation(
            "account_id contains control characters".to_string(),
        ));
    }
    Ok(())
}

/// Parse an IMO from request input, mapping a bad number to a validation error
pub fn parse_imo(raw: &str) -> Result<Imo> {
    Imo::parse(raw).map_err(|e| AppError::Validation(e.to_string()))
}

/// ISO 3166 alpha-2 shape: two ASCII letters
pub fn validate_country_code(field: &str, code: &str) -> Result<()> {
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "{} must be a two-letter country code, got '{}'",
            field, code
        )))
    }
}
