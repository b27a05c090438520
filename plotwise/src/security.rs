//! Security utilities for plotwise.
//!
//! Database URIs embed credentials and are kept in a [`SecureString`] that is
//! zeroized on drop. Table names derived from uploaded file names go through
//! [`SqlSecurity`] before they are registered with the query engine.
//!
//! Filter values are interpolated into SQL text with type-aware quoting (see
//! [`crate::query`]) rather than bound as parameters. That quoting is the only
//! defense for free-form filter values and does not escape embedded quotes.

use crate::error::{ChartError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A secure string that automatically clears its contents when dropped.
#[derive(Clone, ZeroizeOnDrop)]
pub struct SecureString(String);

impl std::fmt::Debug for SecureString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecureString(***)")
    }
}

impl SecureString {
    /// Create a new secure string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the string value. Use carefully and avoid storing the result.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Convert to a regular string. The SecureString will be zeroized.
    pub fn into_string(mut self) -> String {
        let value = std::mem::take(&mut self.0);
        self.0.zeroize();
        value
    }
}

impl From<String> for SecureString {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SecureString {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl PartialEq for SecureString {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl serde::Serialize for SecureString {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for SecureString {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self)
    }
}

static IDENTIFIER_REGEX: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"^[a-zA-Z_][a-zA-Z0-9_]*(\.[a-zA-Z_][a-zA-Z0-9_]*)*$")
        .expect("Hard-coded regex pattern should be valid")
});

static UNSAFE_NAME_CHARS: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"[^a-z0-9_]+").expect("Hard-coded regex pattern should be valid")
});

/// SQL identifier validation utilities.
pub struct SqlSecurity;

impl SqlSecurity {
    /// Validates a (possibly schema-qualified) SQL identifier.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use plotwise::security::SqlSecurity;
    ///
    /// assert!(SqlSecurity::validate_identifier("public.sources_1_sales").is_ok());
    /// assert!(SqlSecurity::validate_identifier("sales; DROP TABLE users").is_err());
    /// ```
    pub fn validate_identifier(identifier: &str) -> Result<()> {
        if identifier.trim().is_empty() {
            return Err(ChartError::SecurityError(
                "SQL identifier cannot be empty or whitespace-only".to_string(),
            ));
        }

        if identifier.len() > 128 {
            return Err(ChartError::SecurityError(
                "SQL identifier too long (max 128 characters)".to_string(),
            ));
        }

        if identifier.contains('\0') {
            return Err(ChartError::SecurityError(
                "SQL identifier cannot contain null bytes".to_string(),
            ));
        }

        if !IDENTIFIER_REGEX.is_match(identifier) {
            return Err(ChartError::SecurityError(format!(
                "Invalid SQL identifier format: '{identifier}'. Identifiers must start with a letter or underscore and contain only letters, numbers, underscores, and dots"
            )));
        }

        Ok(())
    }

    /// Turns an uploaded file name into a table-name fragment.
    ///
    /// The name is trimmed and lower-cased and every run of characters outside
    /// `[a-z0-9_]` collapses into a single underscore.
    ///
    /// ```rust
    /// use plotwise::security::SqlSecurity;
    ///
    /// assert_eq!(SqlSecurity::sanitize_name(" Sales 2024.CSV "), "sales_2024_csv");
    /// ```
    pub fn sanitize_name(name: &str) -> String {
        let lowered = name.trim().to_lowercase();
        UNSAFE_NAME_CHARS.replace_all(&lowered, "_").into_owned()
    }
}
