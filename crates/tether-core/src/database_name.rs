//! Validated database identifiers.
//!
//! A [`DatabaseName`] is the only way a caller can target a schema. The name
//! is checked against a conservative allow-list before any session is
//! requested, so it can be mapped onto a file or connection target without
//! ever being spliced into SQL text.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::AuditError;

/// Longest accepted database name.
pub const MAX_LEN: usize = 128;

/// A non-empty, allow-listed database identifier.
///
/// Accepted: ASCII letters, digits, `_`, `-` and `.`; must start with a
/// letter, digit or underscore; must not contain `..`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "String", into = "String")]
pub struct DatabaseName(String);

impl DatabaseName {
    /// Validate and wrap a raw database name.
    ///
    /// Surrounding whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::InvalidInput`] if the name is empty, too long,
    /// or contains characters outside the allow-list.
    pub fn parse(raw: &str) -> Result<Self, AuditError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(AuditError::InvalidInput("database name is required".into()));
        }
        if name.len() > MAX_LEN {
            return Err(AuditError::InvalidInput(format!(
                "database name exceeds {MAX_LEN} characters"
            )));
        }
        let first_ok = name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_');
        let chars_ok = name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !first_ok || !chars_ok || name.contains("..") {
            return Err(AuditError::InvalidInput(format!(
                "database name '{name}' contains unsupported characters"
            )));
        }
        Ok(Self(name.to_string()))
    }

    /// Borrow the validated name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatabaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DatabaseName {
    type Error = AuditError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<DatabaseName> for String {
    fn from(name: DatabaseName) -> Self {
        name.0
    }
}

impl AsRef<str> for DatabaseName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("Northwind")]
    #[case("sales_2024")]
    #[case("crm-prod.v2")]
    #[case("_scratch")]
    fn accepts_allow_listed_names(#[case] raw: &str) {
        let name = DatabaseName::parse(raw).unwrap();
        assert_eq!(name.as_str(), raw);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("../etc/passwd")]
    #[case("a..b")]
    #[case("Sales'; DROP TABLE users; --")]
    #[case("-leading-dash")]
    #[case(".hidden")]
    #[case("with space")]
    #[case("dir/name")]
    fn rejects_everything_else(#[case] raw: &str) {
        let err = DatabaseName::parse(raw).unwrap_err();
        assert!(matches!(err, AuditError::InvalidInput(_)), "{raw}: {err}");
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let name = DatabaseName::parse("  Northwind \n").unwrap();
        assert_eq!(name.to_string(), "Northwind");
    }

    #[test]
    fn rejects_overlong_names() {
        let raw = "a".repeat(MAX_LEN + 1);
        assert!(DatabaseName::parse(&raw).is_err());
        assert!(DatabaseName::parse(&"a".repeat(MAX_LEN)).is_ok());
    }

    #[test]
    fn deserialization_validates() {
        let ok: DatabaseName = serde_json::from_str("\"Northwind\"").unwrap();
        assert_eq!(ok.as_str(), "Northwind");

        let bad: Result<DatabaseName, _> = serde_json::from_str("\"a/b\"");
        assert!(bad.is_err());
    }
}
