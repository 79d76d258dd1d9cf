//! Form validation
//!
//! Checks run before any backend call so a failed rule never costs a
//! round trip.

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Characters that count as "special" in a password
pub const PASSWORD_SPECIAL_CHARS: &str = "!@#$%^&*(),.?\":{}|<>";

pub const MIN_NAME_LEN: usize = 3;
pub const MIN_SIGNUP_PASSWORD_LEN: usize = 8;
/// Minimum length enforced by the profile page's password form
pub const MIN_PROFILE_PASSWORD_LEN: usize = 6;

/// Validation failures, with the message shown on the form
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Name must be at least 3 characters")]
    NameTooShort,

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Password does not meet the requirements")]
    WeakPassword,

    #[error("Both password fields are required")]
    PasswordMissing,

    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),

    #[error("Passwords do not match")]
    PasswordMismatch,
}

/// Individual password rules, rendered as a live checklist on the sign-up form
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PasswordChecks {
    pub min_length: bool,
    pub uppercase: bool,
    pub digit: bool,
    pub special: bool,
}

impl PasswordChecks {
    pub fn of(password: &str) -> Self {
        Self {
            min_length: password.chars().count() >= MIN_SIGNUP_PASSWORD_LEN,
            uppercase: password.chars().any(|c| c.is_ascii_uppercase()),
            digit: password.chars().any(|c| c.is_ascii_digit()),
            special: password.chars().any(|c| PASSWORD_SPECIAL_CHARS.contains(c)),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.min_length && self.uppercase && self.digit && self.special
    }
}

pub fn is_valid_name(name: &str) -> bool {
    name.trim().chars().count() >= MIN_NAME_LEN
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(email)
}

/// Sign-up rules, checked in form order; the first failure wins
pub fn validate_sign_up(name: &str, email: &str, password: &str) -> Result<(), ValidationError> {
    if !is_valid_name(name) {
        return Err(ValidationError::NameTooShort);
    }
    if !is_valid_email(email) {
        return Err(ValidationError::InvalidEmail);
    }
    if !PasswordChecks::of(password).is_valid() {
        return Err(ValidationError::WeakPassword);
    }
    Ok(())
}

/// New password + confirmation, with an optional minimum length
pub fn validate_new_password(
    password: &str,
    confirm: &str,
    min_len: Option<usize>,
) -> Result<(), ValidationError> {
    if password.is_empty() || confirm.is_empty() {
        return Err(ValidationError::PasswordMissing);
    }
    if password != confirm {
        return Err(ValidationError::PasswordMismatch);
    }
    if let Some(min) = min_len {
        if password.chars().count() < min {
            return Err(ValidationError::PasswordTooShort(min));
        }
    }
    Ok(())
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Any password with all four ingredients passes
        #[test]
        fn strong_passwords_pass(
            upper in "[A-Z]",
            digit in "[0-9]",
            special in "[!@#$%^&*]",
            rest in "[a-z]{5,20}",
        ) {
            let password = format!("{rest}{upper}{digit}{special}");
            prop_assert!(PasswordChecks::of(&password).is_valid());
        }

        /// Passwords without a digit never pass
        #[test]
        fn digitless_passwords_fail(password in "[A-Za-z!@#]{0,30}") {
            prop_assert!(!PasswordChecks::of(&password).is_valid());
        }

        /// Mismatched confirmations are always rejected
        #[test]
        fn mismatch_rejected(a in "[a-z]{6,12}", b in "[A-Z]{6,12}") {
            prop_assert_eq!(validate_new_password(&a, &b, None), Err(ValidationError::PasswordMismatch));
        }
    }
}
