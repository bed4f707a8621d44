//! Input checks shared by payloads and path parameters
//!
//! Every check returns a `ValidationError` naming the offending field; the
//! HTTP layer turns it into a 400.

/// Rejected request input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    #[error("{field} exceeds maximum length of {max} characters")]
    TooLong { field: &'static str, max: usize },

    /// Value doesn't have the required shape, e.g. a non-numeric id
    #[error("{field}: {reason}")]
    InvalidFormat { field: &'static str, reason: &'static str },
}

impl ValidationError {
    /// Name of the field that failed.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Empty { field } | Self::TooLong { field, .. } | Self::InvalidFormat { field, .. } => field,
        }
    }
}

/// Non-blank text of at most `max` characters (counted as chars, not bytes).
pub fn require_text(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }

    Ok(())
}

/// Parse a store id from a path segment.
pub fn parse_id(field: &'static str, raw: &str) -> Result<i64, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::Empty { field });
    }

    raw.parse().map_err(|_| ValidationError::InvalidFormat {
        field,
        reason: "must be an integer",
    })
}
