use bigdecimal::BigDecimal;
use serde::Deserialize;
use std::fmt;

pub const NAME_MAX_LEN: usize = 120;

/// Allowed distance between the sum of both split percentages and 100.
fn split_tolerance() -> BigDecimal {
    BigDecimal::from(1) / BigDecimal::from(100)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StrictPayload<T> {
    #[serde(flatten)]
    pub data: T,
}

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

pub fn validate_max_len(field: &'static str, value: &str, max_len: usize) -> ValidationResult {
    if value.chars().count() > max_len {
        return Err(ValidationError::new(
            field,
            format!("must be at most {} characters", max_len),
        ));
    }

    Ok(())
}

/// Sanitizes an item name and checks it is present and short enough.
pub fn validate_name(value: &str) -> Result<String, ValidationError> {
    let name = sanitize_string(value);
    validate_required("name", &name)?;
    validate_max_len("name", &name, NAME_MAX_LEN)?;
    Ok(name)
}

/// True when both percentages add up to 100, give or take 0.01.
pub fn percentages_sum_to_hundred(percent_a: &BigDecimal, percent_b: &BigDecimal) -> bool {
    let difference = percent_a.clone() + percent_b.clone() - BigDecimal::from(100);
    difference.abs() < split_tolerance()
}

pub fn validate_split(percent_a: &BigDecimal, percent_b: &BigDecimal) -> ValidationResult {
    if !percentages_sum_to_hundred(percent_a, percent_b) {
        return Err(ValidationError::new(
            "split_percent",
            format!(
                "percentages must add up to 100, got {} + {}",
                percent_a, percent_b
            ),
        ));
    }

    Ok(())
}

pub fn validate_positive_amount(field: &'static str, amount: &BigDecimal) -> ValidationResult {
    if amount <= &BigDecimal::from(0) {
        return Err(ValidationError::new(field, "must be greater than zero"));
    }

    Ok(())
}

pub fn validate_non_negative(field: &'static str, amount: &BigDecimal) -> ValidationResult {
    if amount < &BigDecimal::from(0) {
        return Err(ValidationError::new(field, "must not be negative"));
    }

    Ok(())
}

pub fn validate_positive_count(field: &'static str, count: i64) -> ValidationResult {
    if count <= 0 {
        return Err(ValidationError::new(field, "must be greater than zero"));
    }

    Ok(())
}

pub fn validate_count_range(field: &'static str, count: i64, max: i64) -> ValidationResult {
    validate_positive_count(field, count)?;
    if count > max {
        return Err(ValidationError::new(field, format!("must be at most {}", max)));
    }

    Ok(())
}
