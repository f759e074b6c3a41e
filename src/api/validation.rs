use super::ApiError;

pub fn validate_name(name: &str) -> Result<&str, ApiError> {
    let trimmed = name.trim();
    if trimmed.len() < 2 {
        return Err(ApiError::validation(
            "Name must be at least 2 characters long",
        ));
    }
    if trimmed.len() > 100 {
        return Err(ApiError::validation("Name must be 100 characters or less"));
    }
    Ok(trimmed)
}

/// Lightweight shape check, not full RFC 5322. The unique index on the email
/// column is the real gatekeeper.
pub fn validate_email(email: &str) -> Result<String, ApiError> {
    let normalized = email.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(ApiError::validation("Please provide an email address"));
    }

    let mut parts = normalized.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();

    if local.is_empty() || domain.is_empty() || !domain.contains('.') || domain.ends_with('.') {
        return Err(ApiError::validation("Please provide a valid email address"));
    }

    Ok(normalized)
}

pub fn validate_password_strength(password: &str) -> Result<&str, ApiError> {
    if password.len() < 8 {
        return Err(ApiError::validation(
            "Password must be at least 8 characters long",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(ApiError::validation(
            "Password must contain at least one uppercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        return Err(ApiError::validation(
            "Password must contain at least one lowercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ApiError::validation(
            "Password must contain at least one number",
        ));
    }
    Ok(password)
}

/// Pagination query parameters clamped to sane bounds.
pub fn clamp_pagination(page: Option<u64>, limit: Option<u64>) -> (u64, u64) {
    const MAX_LIMIT: u64 = 100;

    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(20).clamp(1, MAX_LIMIT);
    (page, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Jo").is_ok());
        assert_eq!(validate_name("  Alex  ").unwrap(), "Alex");
        assert!(validate_name("A").is_err());
        assert!(validate_name("a".repeat(101).as_str()).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert_eq!(
            validate_email(" Admin@Example.COM ").unwrap(),
            "admin@example.com"
        );
        assert!(validate_email("user@venue.local.org").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("user@").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("user@nodot").is_err());
    }

    #[test]
    fn test_validate_password_strength() {
        assert!(validate_password_strength("Sup3rSecret").is_ok());
        assert!(validate_password_strength("short1A").is_err());
        assert!(validate_password_strength("alllowercase1").is_err());
        assert!(validate_password_strength("ALLUPPERCASE1").is_err());
        assert!(validate_password_strength("NoDigitsHere").is_err());
    }

    #[test]
    fn test_clamp_pagination() {
        assert_eq!(clamp_pagination(None, None), (1, 20));
        assert_eq!(clamp_pagination(Some(0), Some(0)), (1, 1));
        assert_eq!(clamp_pagination(Some(3), Some(500)), (3, 100));
    }
}
