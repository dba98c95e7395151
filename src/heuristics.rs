//! Rule-based contact detection over top-level payload keys.
//!
//! Most form builders and automation tools send flat payloads with one of a
//! handful of conventional key names, so this layer resolves the common case
//! without any external call. Nested structures are left to manual mappings.

use crate::models::ResolvedContact;
use crate::nested_path::field_text;
use serde_json::{Map, Value};

/// Email key variants, highest priority first.
pub const EMAIL_KEYS: &[&str] = &[
    "email",
    "Email",
    "e-mail",
    "E-mail",
    "emailAddress",
    "email_address",
    "customer_email",
    "customerEmail",
    "user_email",
    "userEmail",
    "mail",
];

/// Phone key variants, highest priority first.
pub const PHONE_KEYS: &[&str] = &[
    "phone",
    "Phone",
    "phoneNumber",
    "phone_number",
    "Phone Number",
    "telephone",
    "Telephone",
    "mobile",
    "Mobile",
    "cell",
    "Cell",
    "contact_number",
    "contactNumber",
];

pub const FIRST_NAME_KEYS: &[&str] = &[
    "firstName",
    "first_name",
    "First Name",
    "fname",
    "Fname",
    "given_name",
    "givenName",
    "forename",
    "Forename",
];

pub const LAST_NAME_KEYS: &[&str] = &[
    "lastName",
    "last_name",
    "Last Name",
    "lname",
    "Lname",
    "surname",
    "Surname",
    "family_name",
    "familyName",
];

/// Combined-name keys, consulted only when no first/last name key matched.
pub const FULL_NAME_KEYS: &[&str] = &["name", "Name", "fullName", "full_name", "Full Name"];

pub const COMPANY_KEYS: &[&str] = &[
    "company",
    "Company",
    "companyName",
    "company_name",
    "Company Name",
    "organization",
    "Organization",
    "org",
    "Org",
    "business",
    "Business",
];

/// Detects a contact from the top-level keys of `payload`.
///
/// For every field the first candidate key holding a truthy value wins.
/// Non-object payloads produce an empty contact.
pub fn detect(payload: &Value) -> ResolvedContact {
    let Some(data) = payload.as_object() else {
        return ResolvedContact::default();
    };

    let mut contact = ResolvedContact {
        email: first_match(data, EMAIL_KEYS),
        phone: first_match(data, PHONE_KEYS),
        first_name: first_match(data, FIRST_NAME_KEYS),
        last_name: first_match(data, LAST_NAME_KEYS),
        company: first_match(data, COMPANY_KEYS),
    };

    if contact.first_name.is_none() && contact.last_name.is_none() {
        if let Some(full_name) = first_match(data, FULL_NAME_KEYS) {
            let (first, last) = split_full_name(&full_name);
            contact.first_name = first;
            contact.last_name = last;
        }
    }

    contact
}

/// First truthy value among `keys`, in order.
fn first_match(data: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|key| data.get(*key).and_then(field_text))
}

/// Splits on whitespace runs: first token is the first name, the rest
/// (joined by single spaces) the last name.
pub fn split_full_name(full_name: &str) -> (Option<String>, Option<String>) {
    let mut tokens = full_name.split_whitespace();
    let first = tokens.next().map(str::to_string);
    let rest: Vec<&str> = tokens.collect();
    let last = if rest.is_empty() {
        None
    } else {
        Some(rest.join(" "))
    };

    (first, last)
}
