// Built-in string formats

use crate::schema::StringFormat;
use once_cell::sync::Lazy;
use regex::Regex;

// Common regex patterns
static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$").unwrap()
});

static URI_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^https?://[^\s/$.?#].[^\s]*$").unwrap());

static UUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap()
});

/// Check a string against a well-known format
pub fn matches_format(format: StringFormat, value: &str) -> bool {
    match format {
        StringFormat::Email => EMAIL_REGEX.is_match(value),
        StringFormat::Uuid => UUID_REGEX.is_match(value),
        StringFormat::Uri => URI_REGEX.is_match(value),
    }
}

/// Anchor a user pattern so it has to match the whole string
pub(crate) fn anchored(pattern: &str) -> String {
    let start = if pattern.starts_with('^') { "" } else { "^" };
    let end = if pattern.ends_with('$') { "" } else { "$" };
    format!("{}(?:{}){}", start, pattern, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email() {
        assert!(matches_format(StringFormat::Email, "test@example.com"));
        assert!(matches_format(StringFormat::Email, "user.name+tag@example.co.uk"));
        assert!(!matches_format(StringFormat::Email, "invalid"));
        assert!(!matches_format(StringFormat::Email, "@example.com"));
    }

    #[test]
    fn test_uuid() {
        assert!(matches_format(
            StringFormat::Uuid,
            "550e8400-e29b-41d4-a716-446655440000"
        ));
        assert!(matches_format(
            StringFormat::Uuid,
            "550E8400-E29B-41D4-A716-446655440000"
        ));
        assert!(!matches_format(StringFormat::Uuid, "550e8400"));
    }

    #[test]
    fn test_uri() {
        assert!(matches_format(StringFormat::Uri, "https://example.com/a?b=c"));
        assert!(matches_format(StringFormat::Uri, "http://localhost:3000"));
        assert!(!matches_format(StringFormat::Uri, "example.com"));
    }

    #[test]
    fn test_anchored() {
        assert_eq!(anchored("[a-z]+"), "^(?:[a-z]+)$");
        assert_eq!(anchored("^[a-z]+$"), "(?:^[a-z]+$)");
    }
}
