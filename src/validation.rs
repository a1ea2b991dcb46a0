//! Field checks shared by every write path. The same limits the mobile client
//! shows inline are enforced here, so a direct API caller cannot sidestep
//! them.

use thiserror::Error;

pub const MAX_COMMENT_LENGTH: usize = 50;
pub const MAX_TICKET_DESCRIPTION_LENGTH: usize = 150;
pub const MIN_PASSWORD_LENGTH: usize = 6;
pub const CPF_DIGITS: usize = 11;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    Required(&'static str),
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },
    #[error("{0} has an invalid format")]
    Format(&'static str),
}

pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trims and rejects empty values; returns the trimmed form so callers store
/// what they validated.
pub fn required_trimmed(field: &'static str, value: &str) -> ValidationResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(trimmed.to_string())
}

pub fn max_length(field: &'static str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

pub fn comment_content(value: &str) -> ValidationResult<String> {
    let content = required_trimmed("content", value)?;
    max_length("content", &content, MAX_COMMENT_LENGTH)?;
    Ok(content)
}

pub fn ticket_description(value: &str) -> ValidationResult<String> {
    let description = required_trimmed("description", value)?;
    max_length("description", &description, MAX_TICKET_DESCRIPTION_LENGTH)?;
    Ok(description)
}

pub fn password(value: &str) -> ValidationResult<()> {
    if value.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort {
            field: "password",
            min: MIN_PASSWORD_LENGTH,
        });
    }
    Ok(())
}

/// CPF is taken as exactly eleven digits; formatting characters are the
/// client's concern and are not accepted here.
pub fn cpf(value: &str) -> ValidationResult<String> {
    let trimmed = value.trim();
    if trimmed.len() != CPF_DIGITS || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::Format("cpf"));
    }
    Ok(trimmed.to_string())
}

pub fn email(value: &str) -> ValidationResult<String> {
    let trimmed = required_trimmed("email", value)?;
    let mut parts = trimmed.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");
    if local.is_empty() || domain.is_empty() || !domain.contains('.') {
        return Err(ValidationError::Format("email"));
    }
    Ok(trimmed)
}
