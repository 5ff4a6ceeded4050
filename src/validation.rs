//! Consolidated request validation: one rule table per field, applied by the
//! handlers before anything reaches the domain layer.

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    // at least one letter; letters, digits, spaces, apostrophes and hyphens
    static ref NAME_RE: Regex = Regex::new(r"^[\p{L}\p{M}\d\s'\-]+$").unwrap();
    static ref HAS_LETTER_RE: Regex = Regex::new(r"[\p{L}]").unwrap();
    static ref DOUBLED_SPACE_RE: Regex = Regex::new(r"\s{2,}").unwrap();
}

const RESERVED_NAMES: &[&str] = &[
    "admin",
    "root",
    "system",
    "null",
    "undefined",
    "administrator",
    "superuser",
    "moderator",
    "owner",
    "support",
    "service",
    "bot",
    "api",
    "test",
    "demo",
    "guest",
    "anonymous",
    "user",
    "default",
    "public",
    "private",
];

const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "password1",
    "password123",
    "passw0rd",
    "12345678",
    "qwerty",
    "abc123",
    "letmein",
    "trustno1",
    "iloveyou",
    "sunshine",
    "welcome",
    "admin123",
    "superman",
    "football",
];

pub const ALLOWED_CATEGORIES: &[&str] = &[
    "electronics",
    "clothing",
    "food",
    "furniture",
    "books",
    "toys",
    "sports",
    "automotive",
    "health",
    "beauty",
    "home",
    "garden",
    "office",
    "pet",
    "baby",
    "others",
];

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_name(value: &str) -> Result<(), String> {
    let name = value.trim();
    if name.is_empty() {
        return Err("Name is required".into());
    }
    if name.len() < 3 || name.len() > 50 {
        return Err("Name must be 3-50 characters".into());
    }
    if RESERVED_NAMES.contains(&name.to_lowercase().as_str()) {
        return Err("This name is reserved".into());
    }
    if DOUBLED_SPACE_RE.is_match(name) {
        return Err("Name cannot contain consecutive spaces".into());
    }
    if name.starts_with(['-', '\'']) || name.ends_with(['-', '\'']) {
        return Err("Name cannot start or end with special characters".into());
    }
    if !NAME_RE.is_match(name) || !HAS_LETTER_RE.is_match(name) {
        return Err("Name contains invalid characters".into());
    }
    Ok(())
}

pub fn validate_email(value: &str) -> Result<(), String> {
    let email = normalize_email(value);
    if email.is_empty() {
        return Err("Email is required".into());
    }
    if email.len() > 254 {
        return Err("Email is too long".into());
    }
    if !EMAIL_RE.is_match(&email) {
        return Err("Invalid email format".into());
    }
    Ok(())
}

/// Password strength rules. `name` and `email` are the signup context: the
/// password may not contain the caller's name or email local part.
pub fn validate_password(value: &str, name: Option<&str>, email: Option<&str>) -> Result<(), String> {
    if value.is_empty() {
        return Err("Password is required".into());
    }
    if value.len() < 8 {
        return Err("Password must be at least 8 characters".into());
    }
    if value.len() > 128 {
        return Err("Password is too long".into());
    }
    if !value.chars().any(|c| c.is_ascii_lowercase()) {
        return Err("Password must contain a lowercase letter".into());
    }
    if !value.chars().any(|c| c.is_ascii_uppercase()) {
        return Err("Password must contain an uppercase letter".into());
    }
    if !value.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain a number".into());
    }
    if value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("Password must contain a special character".into());
    }

    let lowered = value.to_lowercase();
    if COMMON_PASSWORDS.iter().any(|c| lowered.contains(c)) {
        return Err("This password is too common".into());
    }
    if let Some(name) = name {
        let name = name.trim().to_lowercase();
        if name.len() >= 3 && lowered.contains(&name) {
            return Err("Password cannot contain your name".into());
        }
    }
    if let Some(email) = email {
        if let Some(local) = normalize_email(email).split('@').next() {
            if local.len() >= 3 && lowered.contains(local) {
                return Err("Password cannot contain your email username".into());
            }
        }
    }
    Ok(())
}

pub fn validate_age(value: i32) -> Result<(), String> {
    if !(10..=120).contains(&value) {
        return Err("Age must be between 10 and 120".into());
    }
    Ok(())
}

pub fn validate_item_name(value: &str) -> Result<(), String> {
    let name = value.trim();
    if name.is_empty() {
        return Err("Item name is required".into());
    }
    if name.len() < 3 || name.len() > 100 {
        return Err("Item name must be 3-100 characters".into());
    }
    if !name.chars().any(|c| c.is_ascii_alphanumeric()) {
        return Err("Item name must contain letters or digits".into());
    }
    if DOUBLED_SPACE_RE.is_match(name) {
        return Err("Item name cannot contain consecutive spaces".into());
    }
    Ok(())
}

pub fn validate_price(value: Decimal) -> Result<(), String> {
    if value.is_sign_negative() {
        return Err("Price cannot be negative".into());
    }
    // NUMERIC(10,2) ceiling
    if value > Decimal::new(9_999_999_999, 2) {
        return Err("Price is too high".into());
    }
    if value.normalize().scale() > 2 {
        return Err("Price can have at most 2 decimal places".into());
    }
    Ok(())
}

pub fn validate_quantity(value: i32) -> Result<(), String> {
    if value < 0 {
        return Err("Quantity cannot be negative".into());
    }
    if value > 10_000_000 {
        return Err("Quantity is too high".into());
    }
    Ok(())
}

/// Categories are a fixed table; input is matched after trim + lowercase.
pub fn validate_category(value: &str) -> Result<(), String> {
    let category = value.trim().to_lowercase();
    if category.is_empty() {
        return Err("Category is required".into());
    }
    if !ALLOWED_CATEGORIES.contains(&category.as_str()) {
        return Err(format!(
            "Invalid category. Allowed categories are: {}",
            ALLOWED_CATEGORIES.join(", ")
        ));
    }
    Ok(())
}

/// Collects rule failures; handlers turn a non-empty result into one 400.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<String>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, result: Result<(), String>) -> &mut Self {
        if let Err(message) = result {
            self.errors.push(message);
        }
        self
    }

    pub fn require(&mut self, condition: bool, message: &str) -> &mut Self {
        if !condition {
            self.errors.push(message.to_string());
        }
        self
    }

    pub fn finish(self) -> Result<(), String> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors.join("; "))
        }
    }
}

#[cfg(test)]
mod validation_tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn name_rules() {
        assert!(validate_name("Ada Lovelace").is_ok());
        assert!(validate_name("  ").is_err());
        assert!(validate_name("ab").is_err());
        assert!(validate_name("admin").is_err());
        assert!(validate_name("Ada  Lovelace").is_err());
        assert!(validate_name("-Ada").is_err());
        assert!(validate_name("12345").is_err());
        assert!(validate_name("Renée O'Brien-Núñez").is_ok());
    }

    #[test]
    fn email_rules() {
        assert!(validate_email("Ada@Example.COM").is_ok());
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("").is_err());
        assert_eq!(normalize_email("  Ada@Example.COM "), "ada@example.com");
    }

    #[test]
    fn password_rules() {
        assert!(validate_password("Str0ng!pass", None, None).is_ok());
        assert!(validate_password("short1!", None, None).is_err());
        assert!(validate_password("alllowercase1!", None, None).is_err());
        assert!(validate_password("NOLOWERCASE1!", None, None).is_err());
        assert!(validate_password("NoDigitsHere!", None, None).is_err());
        assert!(validate_password("NoSpecials11", None, None).is_err());
        assert!(validate_password("Password123!", None, None).is_err()); // common
        assert!(validate_password("Ada!2024xy", Some("ada"), None).is_err());
        assert!(validate_password("Xy!ada2024", None, Some("ada@example.com")).is_err());
    }

    #[test]
    fn age_bounds() {
        assert!(validate_age(10).is_ok());
        assert!(validate_age(120).is_ok());
        assert!(validate_age(9).is_err());
        assert!(validate_age(121).is_err());
    }

    #[test]
    fn price_rules() {
        assert!(validate_price(Decimal::ZERO).is_ok());
        assert!(validate_price(Decimal::from_str("19.99").unwrap()).is_ok());
        assert!(validate_price(Decimal::from_str("-1").unwrap()).is_err());
        assert!(validate_price(Decimal::from_str("0.001").unwrap()).is_err());
        assert!(validate_price(Decimal::from_str("100000000").unwrap()).is_err());
    }

    #[test]
    fn quantity_bounds() {
        assert!(validate_quantity(0).is_ok());
        assert!(validate_quantity(10_000_000).is_ok());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(10_000_001).is_err());
    }

    #[test]
    fn category_table() {
        assert!(validate_category("Electronics").is_ok());
        assert!(validate_category(" food ").is_ok());
        assert!(validate_category("weapons").is_err());
        assert!(validate_category("").is_err());
    }

    #[test]
    fn validator_collects_messages() {
        let mut v = Validator::new();
        v.check(validate_name("x"));
        v.check(validate_email("bad"));
        let err = v.finish().unwrap_err();
        assert!(err.contains("Name"));
        assert!(err.contains("email"));
    }
}
