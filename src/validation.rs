//! Minimum acceptance checks for a resolved contact.
//!
//! Rules are independent; every violation is reported:
//! - email or phone must be present
//! - email must look like `local@domain.tld` with no whitespace
//! - phone must be 10-15 digits once spaces, hyphens, parentheses and `+` are removed
use crate::models::{ResolvedContact, ValidationOutcome};
use once_cell::sync::Lazy;
use regex::Regex;

pub const MISSING_CONTACT_ERROR: &str = "Either email or phone is required";
pub const INVALID_EMAIL_ERROR: &str = "Invalid email format";
pub const INVALID_PHONE_ERROR: &str = "Invalid phone format";

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Validates a contact, collecting all violations.
pub fn validate(contact: &ResolvedContact) -> ValidationOutcome {
    let mut errors = Vec::new();

    if !contact.has_identifier() {
        errors.push(MISSING_CONTACT_ERROR.to_string());
    }

    if let Some(email) = contact.email.as_deref() {
        if !is_valid_email(email) {
            tracing::debug!("Rejected email format: {}", email);
            errors.push(INVALID_EMAIL_ERROR.to_string());
        }
    }

    if let Some(phone) = contact.phone.as_deref() {
        if !is_valid_phone(phone) {
            tracing::debug!("Rejected phone format: {}", phone);
            errors.push(INVALID_PHONE_ERROR.to_string());
        }
    }

    ValidationOutcome {
        valid: errors.is_empty(),
        errors,
    }
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

pub fn is_valid_phone(phone: &str) -> bool {
    let cleaned: String = phone
        .chars()
        .filter(|c| !matches!(c, '-' | '(' | ')' | '+') && !c.is_whitespace())
        .collect();

    (10..=15).contains(&cleaned.len()) && cleaned.chars().all(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(email: Option<&str>, phone: Option<&str>) -> ResolvedContact {
        ResolvedContact {
            email: email.map(str::to_string),
            phone: phone.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_contact_requires_identifier() {
        let outcome = validate(&ResolvedContact::default());
        assert!(!outcome.valid);
        assert_eq!(outcome.errors, vec![MISSING_CONTACT_ERROR.to_string()]);
    }

    #[test]
    fn test_bad_email_only_reports_format() {
        let outcome = validate(&contact(Some("bad"), None));
        assert!(!outcome.valid);
        assert_eq!(outcome.errors, vec![INVALID_EMAIL_ERROR.to_string()]);
    }

    #[test]
    fn test_short_phone_rejected() {
        let outcome = validate(&contact(None, Some("123")));
        assert_eq!(outcome.errors, vec![INVALID_PHONE_ERROR.to_string()]);
    }

    #[test]
    fn test_formatted_phone_accepted() {
        let outcome = validate(&contact(None, Some("+1 (555) 123-4567")));
        assert!(outcome.valid);
        assert!(outcome.errors.is_empty());
    }

    #[test]
    fn test_all_violations_collected() {
        let outcome = validate(&contact(Some("no at sign"), Some("abc")));
        assert_eq!(
            outcome.errors,
            vec![INVALID_EMAIL_ERROR.to_string(), INVALID_PHONE_ERROR.to_string()]
        );
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last+tag@sub.example.org"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a@@b.com"));
        assert!(!is_valid_email("a b@c.com"));
        assert!(!is_valid_email("@b.com"));
    }

    #[test]
    fn test_phone_length_bounds() {
        assert!(is_valid_phone("5551234567"));
        assert!(is_valid_phone("123456789012345"));
        assert!(!is_valid_phone("555123456"));
        assert!(!is_valid_phone("1234567890123456"));
        assert!(!is_valid_phone("555.123.4567"));
    }
}
