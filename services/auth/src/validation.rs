//! Input validation utilities

use regex::Regex;
use std::sync::OnceLock;

/// Validate username
///
/// 3 to 50 characters, starting with a letter or digit, then letters, digits,
/// underscores and hyphens.
pub fn validate_username(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username is required".to_string());
    }

    if username.chars().count() < 3 {
        return Err("Username must be at least 3 characters".to_string());
    }

    if username.chars().count() > 50 {
        return Err("Username must be at most 50 characters".to_string());
    }

    static USERNAME_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = USERNAME_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_-]*$").expect("Failed to compile username regex")
    });

    if !regex.is_match(username) {
        return Err(
            "Username must start with a letter or number and contain only letters, numbers, underscores, and hyphens"
                .to_string(),
        );
    }

    Ok(())
}

/// Validate password
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }

    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err("Password must contain at least one uppercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err("Password must contain at least one lowercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit".to_string());
    }

    Ok(())
}

/// Validate a todo title, returning it trimmed
pub fn validate_todo_title(title: &str) -> Result<String, String> {
    let trimmed = title.trim();

    if trimmed.is_empty() {
        return Err("Title cannot be empty or just whitespace".to_string());
    }

    if trimmed.chars().count() > 200 {
        return Err("Title must be at most 200 characters".to_string());
    }

    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_usernames() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("a_b-c").is_ok());
        assert!(validate_username("007").is_ok());
        assert!(validate_username(&"x".repeat(50)).is_ok());
    }

    #[test]
    fn test_invalid_usernames() {
        assert!(validate_username("").is_err());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"x".repeat(51)).is_err());
        assert!(validate_username("_alice").is_err());
        assert!(validate_username("-alice").is_err());
        assert!(validate_username("ali ce").is_err());
        assert!(validate_username("alice@home").is_err());
    }

    #[test]
    fn test_password_rules() {
        assert!(validate_password("Password123").is_ok());
        assert_eq!(
            validate_password("Pass1"),
            Err("Password must be at least 8 characters".to_string())
        );
        assert_eq!(
            validate_password("password123"),
            Err("Password must contain at least one uppercase letter".to_string())
        );
        assert_eq!(
            validate_password("PASSWORD123"),
            Err("Password must contain at least one lowercase letter".to_string())
        );
        assert_eq!(
            validate_password("Passwordabc"),
            Err("Password must contain at least one digit".to_string())
        );
    }

    #[test]
    fn test_todo_title_rules() {
        assert_eq!(validate_todo_title("  Buy milk "), Ok("Buy milk".to_string()));
        assert_eq!(validate_todo_title(&"t".repeat(200)), Ok("t".repeat(200)));
        assert!(validate_todo_title("").is_err());
        assert!(validate_todo_title("   \t ").is_err());
        assert!(validate_todo_title(&"t".repeat(201)).is_err());
    }
}
