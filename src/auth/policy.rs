//! Credential policy: email and password rules, password hashing.
//!
//! Everything in here is pure. Validation reasons are specific on purpose;
//! they describe format rules only and say nothing about whether an account
//! exists.

use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};
use rand::rngs::OsRng;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

use crate::error::AppError;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 256;
pub const SPECIAL_CHARACTERS: &str = "!@#$%^&*()_+-=[]{}|;:'\",<.>/?";

// Argon2id, m=19 MiB, t=2, p=1
const ARGON2_MEMORY_KIB: u32 = 19_456;
const ARGON2_ITERATIONS: u32 = 2;
const ARGON2_PARALLELISM: u32 = 1;

static DISPLAY_NAME_FORM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<name>.*?)\s*<(?P<addr>[^<>]*)>$").unwrap());
static LOCAL_PART: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*$").unwrap());
static DOMAIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*$").unwrap());

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("email is required")]
    EmailRequired,

    #[error("invalid email format")]
    EmailInvalidFormat,

    #[error("email cannot contain a name")]
    EmailHasName,

    #[error("email cannot contain a comma")]
    EmailHasComma,

    #[error("email cannot contain a semicolon")]
    EmailHasSemicolon,

    #[error("invalid email domain format")]
    EmailInvalidDomain,

    #[error("invalid top-level domain")]
    EmailInvalidTopLevelDomain,

    #[error("password must be at least 8 characters long")]
    PasswordTooShort,

    #[error("password must be at most 256 characters long")]
    PasswordTooLong,

    #[error("password must contain at least one number")]
    PasswordNoDigit,

    #[error("password must contain at least one uppercase letter")]
    PasswordNoUppercase,

    #[error("password must contain at least one special character")]
    PasswordNoSpecial,
}

/// Validate a registration attempt. Email rules run first, then password
/// rules; the first failing rule is reported.
pub fn validate_registration(email: &str, password: &str) -> Result<(), ValidationError> {
    validate_email(email)?;
    validate_password(password)
}

/// Validate an email address and return the bare address it contains.
pub fn validate_email(email: &str) -> Result<&str, ValidationError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::EmailRequired);
    }

    let address = extract_address(email)?;

    if address.contains(',') {
        return Err(ValidationError::EmailHasComma);
    }
    if address.contains(';') {
        return Err(ValidationError::EmailHasSemicolon);
    }

    let (local, domain) = match address.split_once('@') {
        Some((local, domain)) if !domain.contains('@') => (local, domain),
        _ => return Err(ValidationError::EmailInvalidFormat),
    };
    if !LOCAL_PART.is_match(local) || !DOMAIN.is_match(domain) {
        return Err(ValidationError::EmailInvalidFormat);
    }

    if !domain.contains('.') {
        return Err(ValidationError::EmailInvalidDomain);
    }
    let tld = domain.rsplit('.').next().unwrap_or_default();
    if tld.len() < 2 {
        return Err(ValidationError::EmailInvalidTopLevelDomain);
    }

    Ok(address)
}

/// Accepts `addr` or `<addr>`; rejects `Name <addr>`.
fn extract_address(email: &str) -> Result<&str, ValidationError> {
    if !email.contains('<') && !email.contains('>') {
        if email.chars().any(char::is_whitespace) {
            return Err(ValidationError::EmailInvalidFormat);
        }
        return Ok(email);
    }

    let caps = DISPLAY_NAME_FORM
        .captures(email)
        .ok_or(ValidationError::EmailInvalidFormat)?;
    let name = caps.name("name").map_or("", |m| m.as_str());
    let addr = caps.name("addr").map_or("", |m| m.as_str()).trim();

    if !name.trim().is_empty() {
        return Err(ValidationError::EmailHasName);
    }
    if addr.is_empty() || addr.chars().any(char::is_whitespace) {
        return Err(ValidationError::EmailInvalidFormat);
    }
    Ok(addr)
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    // Byte length, so multi-byte characters count toward the bound.
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort);
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooLong);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::PasswordNoDigit);
    }
    if password.to_lowercase() == password {
        return Err(ValidationError::PasswordNoUppercase);
    }
    if !password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)) {
        return Err(ValidationError::PasswordNoSpecial);
    }
    Ok(())
}

/// Canonical form used as the user store's unique key.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    let bare = email
        .strip_prefix('<')
        .and_then(|e| e.strip_suffix('>'))
        .unwrap_or(email);
    bare.trim().to_lowercase()
}

fn hasher() -> Result<Argon2<'static>, AppError> {
    let params = Params::new(ARGON2_MEMORY_KIB, ARGON2_ITERATIONS, ARGON2_PARALLELISM, None)
        .map_err(|e| AppError::InternalError(format!("argon2 params error: {e}")))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a password with Argon2id and a fresh random salt.
pub fn hash_password(plain: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher()?
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| AppError::InternalError(format!("password hash error: {e}")))?;
    Ok(hash.to_string())
}

/// Check a candidate password against a stored PHC hash.
///
/// A malformed hash is reported exactly like a wrong password.
pub fn verify_password(hash: &str, candidate: &str) -> bool {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };
    // Cost parameters come from the PHC string itself.
    Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_registration() {
        assert_eq!(validate_registration("a@example.com", "Secret1!"), Ok(()));
    }

    #[test]
    fn rejects_display_name() {
        assert_eq!(
            validate_email("Bob <bob@example.com>"),
            Err(ValidationError::EmailHasName)
        );
        assert_eq!(
            validate_email("\"Bob Smith\" <bob@example.com>"),
            Err(ValidationError::EmailHasName)
        );
    }

    #[test]
    fn unwraps_angle_address() {
        assert_eq!(validate_email("<bob@example.com>"), Ok("bob@example.com"));
    }

    #[test]
    fn email_rules_in_order() {
        assert_eq!(validate_email(""), Err(ValidationError::EmailRequired));
        assert_eq!(validate_email("   "), Err(ValidationError::EmailRequired));
        assert_eq!(validate_email("a,b@example.com"), Err(ValidationError::EmailHasComma));
        assert_eq!(validate_email("a;b@example.com"), Err(ValidationError::EmailHasSemicolon));
        assert_eq!(validate_email("no-at-sign"), Err(ValidationError::EmailInvalidFormat));
        assert_eq!(validate_email("a@b@example.com"), Err(ValidationError::EmailInvalidFormat));
        assert_eq!(validate_email("@example.com"), Err(ValidationError::EmailInvalidFormat));
        assert_eq!(validate_email("a b@example.com"), Err(ValidationError::EmailInvalidFormat));
        assert_eq!(validate_email("a@localhost"), Err(ValidationError::EmailInvalidDomain));
        assert_eq!(validate_email("a@example.c"), Err(ValidationError::EmailInvalidTopLevelDomain));
        assert_eq!(validate_email("a@example."), Err(ValidationError::EmailInvalidFormat));
        assert_eq!(validate_email("a@example..com"), Err(ValidationError::EmailInvalidFormat));
        assert_eq!(validate_email("a@.example.com"), Err(ValidationError::EmailInvalidFormat));
    }

    #[test]
    fn password_rules_in_order() {
        assert_eq!(validate_password("Ab1!"), Err(ValidationError::PasswordTooShort));
        let long = format!("Aa1!{}", "x".repeat(MAX_PASSWORD_LENGTH));
        assert_eq!(validate_password(&long), Err(ValidationError::PasswordTooLong));
        assert_eq!(validate_password("Password!"), Err(ValidationError::PasswordNoDigit));
        assert_eq!(validate_password("password1"), Err(ValidationError::PasswordNoUppercase));
        assert_eq!(validate_password("Password1"), Err(ValidationError::PasswordNoSpecial));
        assert_eq!(validate_password("Password1!"), Ok(()));
    }

    #[test]
    fn email_checked_before_password() {
        assert_eq!(
            validate_registration("Bob <bob@example.com>", "password1"),
            Err(ValidationError::EmailHasName)
        );
    }

    #[test]
    fn password_bounds_are_inclusive() {
        let min = "Abcde1!x";
        assert_eq!(min.len(), MIN_PASSWORD_LENGTH);
        assert_eq!(validate_password(min), Ok(()));

        let max = format!("Aa1!{}", "x".repeat(MAX_PASSWORD_LENGTH - 4));
        assert_eq!(max.len(), MAX_PASSWORD_LENGTH);
        assert_eq!(validate_password(&max), Ok(()));
    }

    #[test]
    fn normalizes_email() {
        assert_eq!(normalize_email("  Alice@Example.COM "), "alice@example.com");
        assert_eq!(normalize_email("<Bob@Example.com>"), "bob@example.com");
    }

    #[test]
    fn hash_roundtrip() {
        let hash = hash_password("Secret1!").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!hash.contains("Secret1!"));
        assert!(verify_password(&hash, "Secret1!"));
        assert!(!verify_password(&hash, "Secret2!"));
    }

    #[test]
    fn hashes_are_salted() {
        let first = hash_password("Secret1!").unwrap();
        let second = hash_password("Secret1!").unwrap();
        assert_ne!(first, second);
        assert!(verify_password(&first, "Secret1!"));
        assert!(verify_password(&second, "Secret1!"));
    }

    #[test]
    fn malformed_hash_is_a_mismatch() {
        assert!(!verify_password("not-a-hash", "Secret1!"));
        assert!(!verify_password("", ""));
        let long = "x".repeat(MAX_PASSWORD_LENGTH);
        assert!(!verify_password("$argon2id$v=19$garbage", &long));
    }
}
