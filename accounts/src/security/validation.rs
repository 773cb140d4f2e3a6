// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::iam::{ProfileUpdate, SignUpCandidate};
use validator::ValidateEmail;

pub const MAX_EMAIL_CHARS: usize = 40;
pub const MAX_NAME_CHARS: usize = 40;
pub const MIN_USERNAME_CHARS: usize = 3;
pub const MAX_USERNAME_CHARS: usize = 15;
pub const MIN_PASSWORD_CHARS: usize = 6;
pub const MAX_PASSWORD_CHARS: usize = 100;

/// Validate user email input
pub fn validate_email_field(email: &str) -> Result<(), String> {
    let trimmed = email.trim();
    if trimmed.is_empty() {
        return Err("Email is required".to_string());
    }
    if trimmed.chars().count() > MAX_EMAIL_CHARS {
        return Err(format!(
            "Email must be at most {} characters",
            MAX_EMAIL_CHARS
        ));
    }
    if !trimmed.validate_email() {
        return Err("Email format is invalid".to_string());
    }
    Ok(())
}

/// Usernames are matched exactly, so no trimming or case folding happens here.
pub fn validate_username(username: &str) -> Result<(), String> {
    let len = username.chars().count();
    if !(MIN_USERNAME_CHARS..=MAX_USERNAME_CHARS).contains(&len) {
        return Err(format!(
            "Username must be between {} and {} characters",
            MIN_USERNAME_CHARS, MAX_USERNAME_CHARS
        ));
    }

    for char in username.chars() {
        if !char.is_ascii_alphanumeric() && char != '.' && char != '_' && char != '-' {
            return Err(
                "Username can only contain letters, numbers, dots, dashes, and underscores"
                    .to_string(),
            );
        }
    }

    Ok(())
}

/// Returns the trimmed name. `field` is the label used in the error message.
pub fn validate_person_name(field: &str, name: &str) -> Result<String, String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(format!("{} is required", field));
    }
    if trimmed.chars().count() > MAX_NAME_CHARS {
        return Err(format!(
            "{} must be at most {} characters",
            field, MAX_NAME_CHARS
        ));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(format!("{} contains invalid characters", field));
    }
    Ok(trimmed.to_string())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    let len = password.chars().count();
    if !(MIN_PASSWORD_CHARS..=MAX_PASSWORD_CHARS).contains(&len) {
        return Err(format!(
            "Password must be between {} and {} characters",
            MIN_PASSWORD_CHARS, MAX_PASSWORD_CHARS
        ));
    }
    Ok(())
}

pub fn validate_required(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", field));
    }
    Ok(())
}

/// Checks every signup field and returns the candidate with names and email trimmed.
pub fn validate_sign_up(candidate: SignUpCandidate) -> Result<SignUpCandidate, String> {
    let first_name = validate_person_name("First name", &candidate.first_name)?;
    let last_name = validate_person_name("Last name", &candidate.last_name)?;
    validate_username(&candidate.username)?;
    validate_email_field(&candidate.email)?;
    validate_password(&candidate.password)?;

    Ok(SignUpCandidate {
        first_name,
        last_name,
        username: candidate.username,
        email: candidate.email.trim().to_string(),
        password: candidate.password,
    })
}

pub fn validate_profile_update(update: ProfileUpdate) -> Result<ProfileUpdate, String> {
    let first_name = validate_person_name("First name", &update.first_name)?;
    let last_name = validate_person_name("Last name", &update.last_name)?;
    validate_email_field(&update.email)?;

    Ok(ProfileUpdate {
        first_name,
        last_name,
        email: update.email.trim().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate() -> SignUpCandidate {
        SignUpCandidate {
            first_name: " Alice ".to_string(),
            last_name: "Liddell".to_string(),
            username: "alice".to_string(),
            email: " alice@example.com".to_string(),
            password: "secret1".to_string(),
        }
    }

    #[test]
    fn test_validate_email_field() {
        assert!(validate_email_field("user@example.com").is_ok());
        assert!(validate_email_field("").is_err());
        assert!(validate_email_field("not-an-email").is_err());
        let long_email = format!("{}@example.com", "a".repeat(MAX_EMAIL_CHARS));
        assert!(validate_email_field(&long_email).is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("bob").is_ok());
        assert!(validate_username("alice.smith_01").is_ok());
        assert!(validate_username("a-b").is_ok());
        assert!(validate_username(&"a".repeat(15)).is_ok());

        assert!(validate_username("ab").is_err()); // too short
        assert!(validate_username(&"a".repeat(16)).is_err()); // too long
        assert!(validate_username("has space").is_err());
        assert!(validate_username("al@ce").is_err());
        assert!(validate_username("").is_err());
    }

    #[test]
    fn test_validate_person_name() {
        assert_eq!(
            validate_person_name("First name", "  Renée ").unwrap(),
            "Renée"
        );
        assert!(validate_person_name("First name", "   ").is_err());
        assert!(validate_person_name("First name", &"x".repeat(41)).is_err());
        assert!(validate_person_name("First name", "a\u{0007}b").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password(&"p".repeat(101)).is_err());
    }

    #[test]
    fn validate_sign_up_trims_display_fields() {
        let validated = validate_sign_up(candidate()).unwrap();
        assert_eq!(validated.first_name, "Alice");
        assert_eq!(validated.email, "alice@example.com");
        assert_eq!(validated.username, "alice");
    }

    #[test]
    fn validate_sign_up_reports_first_failure() {
        let mut bad = candidate();
        bad.username = "x".to_string();
        bad.password = "1".to_string();
        let err = validate_sign_up(bad).unwrap_err();
        assert!(err.starts_with("Username"));
    }

    #[test]
    fn validate_profile_update_rejects_bad_email() {
        let update = ProfileUpdate {
            first_name: "Alice".to_string(),
            last_name: "Liddell".to_string(),
            email: "nope".to_string(),
        };
        assert!(validate_profile_update(update).is_err());
    }
}
