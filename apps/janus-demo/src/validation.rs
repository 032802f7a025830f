//! Validation rules for REST payloads and gRPC messages.
//!
//! Both transports share [`validate_note`], so a note rejected over REST is
//! rejected over gRPC with the same message.

use janus_core::validation::{max_len, require, FormatRegistry, Validate, ValidationResult};

use crate::notes::NewNote;
use crate::proto::{CreateNoteRequest, GetNoteRequest, ImportNotesResponse, Note};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_BODY_LEN: usize = 10_000;

pub fn validate_note(title: &str, body: &str, author_email: &str, formats: &FormatRegistry) -> ValidationResult<()> {
    require("title", title)?;
    max_len("title", title, MAX_TITLE_LEN)?;
    max_len("body", body, MAX_BODY_LEN)?;
    require("author_email", author_email)?;
    formats.check("author_email", "email", author_email)
}

impl Validate for NewNote {
    fn validate(&self, formats: &FormatRegistry) -> ValidationResult<()> {
        validate_note(&self.title, &self.body, &self.author_email, formats)
    }
}

impl Validate for CreateNoteRequest {
    fn validate(&self, formats: &FormatRegistry) -> ValidationResult<()> {
        validate_note(&self.title, &self.body, &self.author_email, formats)
    }
}

impl Validate for GetNoteRequest {
    fn validate(&self, formats: &FormatRegistry) -> ValidationResult<()> {
        require("id", &self.id)?;
        formats.check("id", "uuid", &self.id)
    }
}

// Responses are decoded by the generated client; nothing to check.

impl Validate for Note {
    fn validate(&self, _formats: &FormatRegistry) -> ValidationResult<()> {
        Ok(())
    }
}

impl Validate for ImportNotesResponse {
    fn validate(&self, _formats: &FormatRegistry) -> ValidationResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formats() -> &'static FormatRegistry {
        FormatRegistry::shared()
    }

    #[test]
    fn test_valid_note() {
        assert!(validate_note("Groceries", "milk", "ada@example.com", formats()).is_ok());
    }

    #[test]
    fn test_blank_title_is_required() {
        let err = validate_note("  ", "", "ada@example.com", formats()).unwrap_err();
        assert_eq!(err.to_string(), "title is required");
    }

    #[test]
    fn test_long_title_is_rejected() {
        let title = "x".repeat(MAX_TITLE_LEN + 1);
        let err = validate_note(&title, "", "ada@example.com", formats()).unwrap_err();
        assert_eq!(err.to_string(), "title must be at most 200 characters");
    }

    #[test]
    fn test_bad_email_is_rejected() {
        let err = validate_note("t", "", "not-an-email", formats()).unwrap_err();
        assert_eq!(err.to_string(), "author_email is not a valid email");
    }

    #[test]
    fn test_get_note_requires_uuid() {
        let bad = GetNoteRequest { id: "42".into() };
        assert!(bad.validate(formats()).is_err());
        let good = GetNoteRequest {
            id: uuid::Uuid::new_v4().to_string(),
        };
        assert!(good.validate(formats()).is_ok());
    }
}
