//! Input validation for account fields.

/// Longest accepted email address, in bytes.
pub const MAX_EMAIL_LENGTH: usize = 256;

/// Longest accepted password, in bytes.
pub const MAX_PASSWORD_LENGTH: usize = 1024;

/// Longest accepted display name, in bytes.
pub const MAX_NAME_LENGTH: usize = 256;

/// Shortest accepted password, in bytes.
pub const MIN_PASSWORD_LENGTH: usize = 8;

const PASSWORD_SPECIALS: &str = "0123456789!@#$%^&*()_+-=[]{}\\|;:'\"`~,.<>/?";

/// A display name fits in [`MAX_NAME_LENGTH`].
#[must_use]
pub fn name_is_valid(name: &str) -> bool {
    name.len() <= MAX_NAME_LENGTH
}

/// A deliberately simple structural email check.
///
/// Requires an `@` that is not first, followed later by a `.` that is neither
/// adjacent to the `@` nor last.
#[must_use]
pub fn email_is_valid(email: &str) -> bool {
    if email.len() < 5 || email.len() > MAX_EMAIL_LENGTH {
        return false;
    }
    let (Some(at), Some(dot)) = (email.find('@'), email.rfind('.')) else {
        return false;
    };
    at > 0 && dot > at + 1 && dot < email.len() - 1
}

/// Length between [`MIN_PASSWORD_LENGTH`] and [`MAX_PASSWORD_LENGTH`], with at
/// least one digit or symbol.
#[must_use]
pub fn password_is_valid(password: &str) -> bool {
    (MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&password.len())
        && password.chars().any(|c| PASSWORD_SPECIALS.contains(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_accept_plain_addresses() {
        assert!(email_is_valid("ada@example.com"));
        assert!(email_is_valid("a@b.co"));
    }

    #[test]
    fn test_should_reject_malformed_addresses() {
        for email in [
            "",
            "a@b.",
            "@example.com",
            "ada.example.com",
            "ada@example",
            "ada@.com",
            "first.last@host",
        ] {
            assert!(!email_is_valid(email), "{email}");
        }
        assert!(!email_is_valid(&format!("{}@example.com", "a".repeat(MAX_EMAIL_LENGTH))));
    }

    #[test]
    fn test_should_require_digit_or_symbol_in_password() {
        assert!(password_is_valid("correct horse 1"));
        assert!(password_is_valid("hunter!!"));
        assert!(!password_is_valid("password"));
        assert!(!password_is_valid("sh0rt"));
        assert!(!password_is_valid(&"x1".repeat(MAX_PASSWORD_LENGTH)));
    }

    #[test]
    fn test_should_limit_name_length() {
        assert!(name_is_valid(""));
        assert!(name_is_valid(&"n".repeat(MAX_NAME_LENGTH)));
        assert!(!name_is_valid(&"n".repeat(MAX_NAME_LENGTH + 1)));
    }
}
