//! Field-level input checks shared by every service.
//!
//! Services collect problems into a `Violations` list and convert it into a
//! single validation error, so a client sees every bad field at once.

pub mod references;

use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::services::ServiceError;

pub use references::{EntityKind, ReferenceValidator};

static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+?\d{10,15}$").expect("phone pattern is valid"));
static URL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://\S+$").expect("url pattern is valid"));

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct Violations {
    errors: Vec<FieldError>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }

    /// `Ok` when nothing was recorded, otherwise one validation error led by the first message.
    pub fn finish(self) -> Result<(), ServiceError> {
        let Some(message) = self.errors.first().map(|e| e.message.clone()) else {
            return Ok(());
        };
        Err(ServiceError::Validation {
            message,
            fields: self.errors,
        })
    }

    /// Records `message` when `value` is missing and passes the value through.
    pub fn require<T>(&mut self, field: &str, value: Option<T>, message: &str) -> Option<T> {
        if value.is_none() {
            self.add(field, message);
        }
        value
    }

    pub fn phone(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value {
            if !is_phone(v) {
                self.add(field, "Invalid phone number format");
            }
        }
    }

    pub fn url(&mut self, field: &str, value: Option<&str>) {
        if let Some(v) = value {
            if !URL_RE.is_match(v) {
                self.add(field, "Photo URL must start with http:// or https://");
            }
        }
    }

    pub fn min_len(&mut self, field: &str, value: Option<&str>, min: usize, message: &str) {
        if let Some(v) = value {
            if v.chars().count() < min {
                self.add(field, message);
            }
        }
    }

    pub fn max_len(&mut self, field: &str, value: Option<&str>, max: usize, message: &str) {
        if let Some(v) = value {
            if v.chars().count() > max {
                self.add(field, message);
            }
        }
    }

    pub fn not_future(&mut self, field: &str, value: Option<NaiveDate>, message: &str) {
        if let Some(date) = value {
            if date > today() {
                self.add(field, message);
            }
        }
    }
}

pub fn is_phone(value: &str) -> bool {
    PHONE_RE.is_match(value)
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Trims a string, mapping blank input to `None`.
pub fn clean(value: Option<String>) -> Option<String> {
    value.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// `clean` for patch fields: an explicit null or blank string clears the field.
pub fn clean_patch(value: Option<Option<String>>) -> Option<Option<String>> {
    value.map(clean)
}

/// Applies a patch field onto the current value.
pub fn merge<T>(current: Option<T>, patch: Option<Option<T>>) -> Option<T> {
    match patch {
        Some(next) => next,
        None => current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn phone_format() {
        assert!(is_phone("0911223344"));
        assert!(is_phone("+251911223344"));
        assert!(!is_phone("09112233"));
        assert!(!is_phone("+25191122334455667"));
        assert!(!is_phone("0911-223-344"));
    }

    #[test]
    fn collects_every_violation() {
        let mut v = Violations::new();
        v.require::<String>("firstName", None, "First name is required");
        v.phone("phone", Some("abc"));
        v.url("photoUrl", Some("ftp://x"));
        v.url("photoUrl", Some("https://cdn.example.com/a.png"));
        v.not_future("dateOfBirth", Some(today() + Duration::days(1)), "Date of birth cannot be in the future");
        v.max_len("christianityName", Some(&"x".repeat(101)), 100, "too long");
        let errors = v.into_errors();
        assert_eq!(errors.len(), 5);
        assert_eq!(errors[0].field, "firstName");
    }

    #[test]
    fn clean_trims_and_drops_blank() {
        assert_eq!(clean(Some("  Abebe ".to_string())), Some("Abebe".to_string()));
        assert_eq!(clean(Some("   ".to_string())), None);
        assert_eq!(clean_patch(Some(Some(" ".to_string()))), Some(None));
        assert_eq!(clean_patch(None), None);
    }

    #[test]
    fn merge_respects_absent_and_null() {
        assert_eq!(merge(Some(1), None), Some(1));
        assert_eq!(merge(Some(1), Some(None)), None);
        assert_eq!(merge(None, Some(Some(2))), Some(2));
    }
}
