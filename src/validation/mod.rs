use bigdecimal::BigDecimal;
use std::fmt;
use uuid::Uuid;

use crate::domain::{MailingAddress, SUPPORTED_CURRENCY};

pub const NOTES_MAX_LEN: usize = 280;
pub const ADDRESS_LINE_MAX_LEN: usize = 100;
pub const CVV_MIN_LEN: usize = 3;
pub const CVV_MAX_LEN: usize = 4;
pub const ALLOWED_CURRENCIES: &[&str] = &[SUPPORTED_CURRENCY];

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

pub fn validate_required(field: &'static str, value: &str) -> ValidationResult {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }

    Ok(())
}

pub fn require_id(field: &'static str, value: Option<Uuid>) -> Result<Uuid, ValidationError> {
    match value {
        Some(id) if !id.is_nil() => Ok(id),
        _ => Err(ValidationError::new(field, "is required")),
    }
}

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.len() > max_len {
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

pub fn validate_currency(currency: &str) -> ValidationResult {
    let currency = sanitize_string(currency);
    validate_required("currency", &currency)?;
    validate_enum("currency", &currency, ALLOWED_CURRENCIES)
}

pub fn validate_positive_amount(amount: &BigDecimal) -> ValidationResult {
    if amount <= &BigDecimal::from(0) {
        return Err(ValidationError::new("amount", "must be greater than zero"));
    }

    Ok(())
}

pub fn validate_cvv(cvv: Option<&str>) -> ValidationResult {
    let cvv = cvv.map(str::trim).unwrap_or("");
    validate_required("cvv", cvv)?;

    if cvv.len() < CVV_MIN_LEN || cvv.len() > CVV_MAX_LEN || !cvv.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(ValidationError::new("cvv", "must be 3 or 4 digits"));
    }

    Ok(())
}

pub fn validate_notes(notes: Option<&str>) -> ValidationResult {
    match notes {
        Some(notes) => validate_max_len("notes", notes, NOTES_MAX_LEN),
        None => Ok(()),
    }
}

pub fn validate_address(address: &MailingAddress) -> ValidationResult {
    validate_required("check_address.line1", &address.line1)?;
    validate_max_len("check_address.line1", &address.line1, ADDRESS_LINE_MAX_LEN)?;
    validate_required("check_address.city", &address.city)?;
    validate_required("check_address.state", &address.state)?;

    let state = address.state.trim();
    if state.len() != 2 || !state.chars().all(|ch| ch.is_ascii_alphabetic()) {
        return Err(ValidationError::new(
            "check_address.state",
            "must be a two-letter state code",
        ));
    }

    let postal = address.postal_code.trim();
    let digits: String = postal.chars().filter(|ch| *ch != '-').collect();
    if !(digits.len() == 5 || digits.len() == 9) || !digits.chars().all(|ch| ch.is_ascii_digit()) {
        return Err(ValidationError::new(
            "check_address.postal_code",
            "must be a 5 or 9 digit ZIP code",
        ));
    }

    Ok(())
}
