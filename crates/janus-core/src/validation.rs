//! # Validation Module
//!
//! Payload validation run by the interceptor chain before a handler sees
//! the message.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Flow                                    │
//! │                                                                         │
//! │  gRPC: ValidatingCodec decodes message ──┐                             │
//! │        (every stream message, in order)  │                             │
//! │                                          ▼                              │
//! │                            T: Validate ─► validate(&FormatRegistry)     │
//! │                                          ▲        │                     │
//! │  REST: ValidatedJson<T> extractor ───────┘        │                     │
//! │                                                   ▼                     │
//! │                           Err ─► InvalidArgument / HTTP 400             │
//! │                           Ok  ─► handler runs                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use janus_core::validation::{FormatRegistry, Validate, ValidationResult, require, max_len};
//!
//! struct Signup { email: String, name: String }
//!
//! impl Validate for Signup {
//!     fn validate(&self, formats: &FormatRegistry) -> ValidationResult<()> {
//!         require("name", &self.name)?;
//!         max_len("name", &self.name, 100)?;
//!         formats.check("email", "email", &self.email)
//!     }
//! }
//!
//! let ok = Signup { email: "ada@example.com".into(), name: "Ada".into() };
//! assert!(ok.validate(FormatRegistry::shared()).is_ok());
//! ```

use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::OnceLock;

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// A message that can check itself.
pub trait Validate {
    fn validate(&self, formats: &FormatRegistry) -> ValidationResult<()>;
}

/// Predicate deciding whether a string matches a named format.
pub type FormatCheck = fn(&str) -> bool;

static SHARED: OnceLock<FormatRegistry> = OnceLock::new();

// =============================================================================
// Format Registry
// =============================================================================

/// Named string formats available to validators.
///
/// Read-only once built; make one process-wide with
/// [`FormatRegistry::install`] and read it back with [`FormatRegistry::shared`].
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    formats: HashMap<String, FormatCheck>,
}

impl FormatRegistry {
    /// Registry with no formats.
    pub fn empty() -> Self {
        Self {
            formats: HashMap::new(),
        }
    }

    /// Registry with the built-in formats: `email`, `uuid`, `date-time`,
    /// `date`, `ipv4`, `ipv6`, `hostname`, `uri`.
    pub fn standard() -> Self {
        Self::empty()
            .with("email", is_email)
            .with("uuid", |v| uuid::Uuid::parse_str(v).is_ok())
            .with("date-time", |v| chrono::DateTime::parse_from_rfc3339(v).is_ok())
            .with("date", |v| chrono::NaiveDate::parse_from_str(v, "%Y-%m-%d").is_ok())
            .with("ipv4", |v| v.parse::<Ipv4Addr>().is_ok())
            .with("ipv6", |v| v.parse::<Ipv6Addr>().is_ok())
            .with("hostname", is_hostname)
            .with("uri", |v| url::Url::parse(v).is_ok())
    }

    /// Process-wide registry used by the host's validating codec and
    /// extractor.
    ///
    /// This is the registry passed to [`FormatRegistry::install`], or the
    /// standard set when nothing was installed before first use.
    pub fn shared() -> &'static FormatRegistry {
        SHARED.get_or_init(FormatRegistry::standard)
    }

    /// Makes `self` the process-wide registry.
    ///
    /// Must happen before the first call to [`FormatRegistry::shared`]
    /// (in practice: before serving). Afterwards the shared registry is
    /// frozen and `self` is handed back.
    pub fn install(self) -> Result<(), FormatRegistry> {
        SHARED.set(self)
    }

    /// Adds or replaces a format.
    pub fn with(mut self, name: impl Into<String>, check: FormatCheck) -> Self {
        self.formats.insert(name.into(), check);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }

    /// `None` when the format is unknown.
    pub fn is_valid(&self, format: &str, value: &str) -> Option<bool> {
        self.formats.get(format).map(|check| check(value))
    }

    /// Checks `value` of `field` against `format`.
    pub fn check(&self, field: &str, format: &str, value: &str) -> ValidationResult<()> {
        match self.is_valid(format, value) {
            Some(true) => Ok(()),
            Some(false) => Err(ValidationError::InvalidFormat {
                field: field.to_string(),
                format: format.to_string(),
            }),
            None => Err(ValidationError::UnknownFormat {
                field: field.to_string(),
                format: format.to_string(),
            }),
        }
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };
    !local.is_empty()
        && !local.contains(char::is_whitespace)
        && domain.contains('.')
        && is_hostname(domain)
}

fn is_hostname(value: &str) -> bool {
    if value.is_empty() || value.len() > 253 {
        return false;
    }
    value.trim_end_matches('.').split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

// =============================================================================
// Field Validators
// =============================================================================

/// Fails when `value` is empty after trimming.
pub fn require(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Fails when `value` has more than `max` characters.
pub fn max_len(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Fails when `value` has fewer than `min` characters.
pub fn min_len(field: &str, value: &str, min: usize) -> ValidationResult<()> {
    if value.chars().count() < min {
        return Err(ValidationError::TooShort {
            field: field.to_string(),
            min,
        });
    }
    Ok(())
}

/// Fails when `value` is outside `min..=max`.
pub fn in_range(field: &str, value: i64, min: i64, max: i64) -> ValidationResult<()> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min,
            max,
        });
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_formats() {
        let formats = FormatRegistry::standard();
        assert_eq!(formats.is_valid("email", "ada@example.com"), Some(true));
        assert_eq!(formats.is_valid("email", "ada@localhost"), Some(false));
        assert_eq!(formats.is_valid("email", "@example.com"), Some(false));
        assert_eq!(
            formats.is_valid("uuid", "67e55044-10b1-426f-9247-bb680e5fe0c8"),
            Some(true)
        );
        assert_eq!(formats.is_valid("uuid", "not-a-uuid"), Some(false));
        assert_eq!(formats.is_valid("date-time", "2024-05-01T10:00:00Z"), Some(true));
        assert_eq!(formats.is_valid("date", "2024-02-30"), Some(false));
        assert_eq!(formats.is_valid("ipv4", "10.0.0.1"), Some(true));
        assert_eq!(formats.is_valid("ipv6", "::1"), Some(true));
        assert_eq!(formats.is_valid("hostname", "api.example.com"), Some(true));
        assert_eq!(formats.is_valid("hostname", "-bad-.com"), Some(false));
        assert_eq!(formats.is_valid("uri", "https://example.com/a?b=c"), Some(true));
        assert_eq!(formats.is_valid("color", "red"), None);
    }

    #[test]
    fn test_check_reports_field_and_format() {
        let err = FormatRegistry::shared()
            .check("author_email", "email", "nope")
            .unwrap_err();
        assert_eq!(err.to_string(), "author_email is not a valid email");

        let err = FormatRegistry::shared()
            .check("colour", "colour", "red")
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnknownFormat { .. }));
    }

    #[test]
    fn test_custom_format() {
        let formats = FormatRegistry::empty().with("even", |v| {
            v.parse::<u32>().map(|n| n % 2 == 0).unwrap_or(false)
        });
        assert!(formats.check("n", "even", "4").is_ok());
        assert!(formats.check("n", "even", "3").is_err());
        assert!(!formats.contains("email"));
    }

    #[test]
    fn test_field_validators() {
        assert!(require("title", "hello").is_ok());
        assert!(matches!(
            require("title", "   "),
            Err(ValidationError::Required { .. })
        ));
        assert!(max_len("title", "abc", 3).is_ok());
        assert!(max_len("title", "abcd", 3).is_err());
        assert!(min_len("title", "ab", 3).is_err());
        assert!(in_range("limit", 5, 1, 10).is_ok());
        assert!(in_range("limit", 11, 1, 10).is_err());
    }
}
