//! SQL identifier handling for runtime table and column names.

use stowage_core::{AttachmentError, AttachmentResult};

/// PostgreSQL truncates identifiers longer than this
const MAX_IDENTIFIER_LEN: usize = 63;

/// Validate `name` as a plain identifier and return it double-quoted.
///
/// Only ASCII letters, digits and underscores are accepted, starting with a
/// letter or underscore. Quoting keeps the case of names like `Books`.
pub fn quote_identifier(name: &str) -> AttachmentResult<String> {
    let mut chars = name.chars();
    let starts_well = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !starts_well || !rest_ok || name.len() > MAX_IDENTIFIER_LEN {
        return Err(AttachmentError::Metadata(format!(
            "Invalid SQL identifier: {:?}",
            name
        )));
    }
    Ok(format!("\"{}\"", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_plain_identifiers() {
        assert_eq!(
            quote_identifier("catalog_Books_attachments").unwrap(),
            "\"catalog_Books_attachments\""
        );
        assert_eq!(quote_identifier("_id").unwrap(), "\"_id\"");
    }

    #[test]
    fn test_rejects_injection_and_malformed_names() {
        for name in [
            "",
            "1table",
            "books; DROP TABLE users",
            "books\"",
            "catalog.Books",
            "naïve",
        ] {
            assert!(quote_identifier(name).is_err(), "{:?} should be rejected", name);
        }
    }

    #[test]
    fn test_rejects_overlong_names() {
        assert!(quote_identifier(&"a".repeat(63)).is_ok());
        assert!(quote_identifier(&"a".repeat(64)).is_err());
    }
}
