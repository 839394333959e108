//! Common result and error types for invariant violations.

/// The result type for checks that can only fail because of a bug.
///
/// `Err` indicates a broken internal invariant (for example an owner edge
/// without the matching child edge), not a problem with user data.
pub type RespackResult<T> = Result<T, InternalError>;

/// An internal error indicating a logic bug, not a user input problem.
#[derive(Debug, thiserror::Error)]
#[error("internal error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}
