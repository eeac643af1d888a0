//! Input shape checks applied before credentials or profiles are persisted.

use lazy_static::lazy_static;
use regex::Regex;
use validator::{ValidationError, ValidationErrors};

use super::user::ProfileFields;

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("EMAIL_REGEX should be a valid regex pattern");

    static ref HANDLE_REGEX: Regex = Regex::new(r"^@[A-Za-z0-9_]{5,32}$")
        .expect("HANDLE_REGEX should be a valid regex pattern");

    static ref PHONE_REGEX: Regex = Regex::new(r"^\+?\d{10,15}$")
        .expect("PHONE_REGEX should be a valid regex pattern");

    static ref PASSWORD_CHARSET_REGEX: Regex =
        Regex::new(r"^[A-Za-z0-9!@#$%^&*()\[\]\-_=+{}|;:,.<>?/]+$")
            .expect("PASSWORD_CHARSET_REGEX should be a valid regex pattern");

    static ref NAME_REGEX: Regex = Regex::new(r"^[A-Za-zА-Яа-яЁё]{2,}$")
        .expect("NAME_REGEX should be a valid regex pattern");
}

/// Minimum password length requirement
const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length, bounds hashing cost per request
const MAX_PASSWORD_LENGTH: usize = 128;

/// Pure predicates over raw input strings.
pub trait CredentialValidator: Send + Sync {
    fn is_valid_email(&self, email: &str) -> bool;
    fn is_valid_password(&self, password: &str) -> bool;
    fn is_valid_phone(&self, phone: &str) -> bool;
    fn is_valid_handle(&self, handle: &str) -> bool;
    fn is_valid_name(&self, name: &str) -> bool;

    /// Check every validated profile field, collecting all failures.
    fn check_profile(&self, profile: &ProfileFields) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.is_valid_email(&profile.email) {
            errors.add("email", rejection("invalid_email", "Invalid email"));
        }
        if !self.is_valid_name(&profile.name) {
            errors.add("name", rejection("invalid_name", "Invalid name"));
        }
        if !self.is_valid_phone(&profile.phone_number) {
            errors.add("phone_number", rejection("invalid_phone", "Invalid phone number"));
        }
        if !self.is_valid_handle(&profile.telegram) {
            errors.add("telegram", rejection("invalid_handle", "Invalid messaging handle"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Profile checks plus password strength.
    fn check_registration(
        &self,
        profile: &ProfileFields,
        password: &str,
    ) -> Result<(), ValidationErrors> {
        let mut errors = match self.check_profile(profile) {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        if !self.is_valid_password(password) {
            errors.add(
                "password",
                rejection("weak_password", "Password is weak or contains unsupported symbols"),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn rejection(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(message.into())
}

/// Default regex-backed validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexCredentialValidator;

impl CredentialValidator for RegexCredentialValidator {
    fn is_valid_email(&self, email: &str) -> bool {
        EMAIL_REGEX.is_match(email)
    }

    fn is_valid_password(&self, password: &str) -> bool {
        (MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&password.len())
            && PASSWORD_CHARSET_REGEX.is_match(password)
    }

    fn is_valid_phone(&self, phone: &str) -> bool {
        PHONE_REGEX.is_match(phone)
    }

    fn is_valid_handle(&self, handle: &str) -> bool {
        HANDLE_REGEX.is_match(handle)
    }

    fn is_valid_name(&self, name: &str) -> bool {
        NAME_REGEX.is_match(name)
    }
}
