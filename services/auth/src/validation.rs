//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

use crate::models::{ProfileChanges, RegistrationRequest};

/// Validate a phone number used as login key
pub fn validate_phone(phone: &str) -> Result<(), String> {
    if phone.is_empty() {
        return Err("Phone number is required".to_string());
    }

    static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = PHONE_REGEX
        .get_or_init(|| Regex::new(r"^\+?[0-9]{9,15}$").expect("Failed to compile phone regex"));

    if !regex.is_match(phone) {
        return Err("Phone number must contain 9 to 15 digits".to_string());
    }

    Ok(())
}

/// Validate display name
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Name is required".to_string());
    }

    if name.chars().count() > 100 {
        return Err("Name must be at most 100 characters long".to_string());
    }

    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.chars().count() < 6 {
        return Err("Password must be at least 6 characters long".to_string());
    }

    if password.len() > 128 {
        return Err("Password must be at most 128 characters long".to_string());
    }

    if password.trim().is_empty() {
        return Err("Password must not be blank".to_string());
    }

    Ok(())
}

/// Validate a self-registration request
pub fn validate_registration(request: &RegistrationRequest) -> Result<(), String> {
    validate_name(&request.name)?;
    validate_phone(&request.phone)?;
    validate_password(&request.password)?;
    if let Some(email) = &request.email {
        validate_email(email)?;
    }
    Ok(())
}

/// Validate the profile fields present in an update
pub fn validate_profile_changes(changes: &ProfileChanges) -> Result<(), String> {
    if let Some(name) = &changes.name {
        validate_name(name)?;
    }
    if let Some(phone) = &changes.phone {
        validate_phone(phone)?;
    }
    if let Some(email) = &changes.email {
        validate_email(email)?;
    }
    Ok(())
}
