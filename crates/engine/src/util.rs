//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use sea_orm::sea_query::LikeExpr;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

pub(crate) fn parse_optional_uuid(value: Option<&str>, label: &str) -> ResultEngine<Option<Uuid>> {
    value.map(|raw| parse_uuid(raw, label)).transpose()
}

/// Trims and NFC-normalizes free text; blank input becomes `None`.
pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.nfc().collect())
}

pub(crate) fn normalize_required_text(value: &str, label: &str) -> ResultEngine<String> {
    normalize_optional_text(Some(value))
        .ok_or_else(|| EngineError::InvalidInput(format!("{label} must not be empty")))
}

/// Ensures a free-text field stays within `max` characters.
pub(crate) fn ensure_max_len(value: Option<&str>, max: usize, label: &str) -> ResultEngine<()> {
    if value.is_some_and(|v| v.chars().count() > max) {
        return Err(EngineError::InvalidInput(format!(
            "{label} must not exceed {max} characters"
        )));
    }
    Ok(())
}

pub(crate) fn normalize_email(value: &str) -> ResultEngine<String> {
    let email = value.trim().to_lowercase();
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(EngineError::InvalidInput(format!("invalid email: {email}")));
    }
    Ok(email)
}

/// `LIKE` pattern matching `value` as a literal substring.
///
/// `%`, `_` and the escape character itself are escaped, so user input never
/// acts as a wildcard.
pub(crate) fn contains_pattern(value: &str) -> LikeExpr {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    LikeExpr::new(pattern).escape('\\')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_text_becomes_none() {
        assert_eq!(normalize_optional_text(Some("   ")), None);
        assert_eq!(normalize_optional_text(Some(" food ")), Some("food".to_string()));
        assert_eq!(normalize_optional_text(None), None);
    }

    #[test]
    fn text_is_nfc_normalized() {
        let decomposed = "Cafe\u{301}";
        assert_eq!(
            normalize_optional_text(Some(decomposed)),
            Some("Caf\u{e9}".to_string())
        );
    }

    #[test]
    fn email_shape() {
        assert_eq!(normalize_email(" Ana@Example.com ").unwrap(), "ana@example.com");
        assert!(normalize_email("not-an-email").is_err());
        assert!(normalize_email("@example.com").is_err());
    }
}
