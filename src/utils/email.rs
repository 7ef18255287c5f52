use crate::error::{AppError, AppResult};
use regex::Regex;
use std::sync::OnceLock;

fn email_regex() -> &'static Regex {
    static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
    EMAIL_RE.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
    })
}

/// Trim and lowercase; emails are compared in this form everywhere.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Normalizes `email` and rejects blank or malformed input.
pub fn parse_email(email: &str) -> AppResult<String> {
    let normalized = normalize_email(email);
    if normalized.is_empty() {
        return Err(AppError::ValidationError(
            "Please enter an email address.".to_string(),
        ));
    }
    if !email_regex().is_match(&normalized) {
        return Err(AppError::ValidationError(
            "Please enter a valid email address.".to_string(),
        ));
    }
    Ok(normalized)
}
