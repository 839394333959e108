//! Error types for model serialization and validation.

use std::fmt;

use respack_codec::CodecError;
use respack_common::{EntryId, ModelId};

/// Errors produced while serializing or validating a model.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// A payload could not be compressed or decompressed.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The model failed structural validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A collection has handed out every entry id it can represent.
    #[error("{collection} has no entry ids left")]
    EntryIdsExhausted {
        /// The collection that ran out.
        collection: ModelId,
    },

    /// The model could not be written in its binary form.
    #[error("serialization failed: {reason}")]
    Serialize {
        /// Description of the failure.
        reason: String,
    },
}

/// A single structural problem found during validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// The offending entry, when the problem belongs to one.
    pub entry: Option<EntryId>,
    /// Description of the problem.
    pub reason: String,
}

impl Violation {
    /// Creates a violation attributed to an entry.
    pub fn entry(entry: EntryId, reason: impl Into<String>) -> Self {
        Self {
            entry: Some(entry),
            reason: reason.into(),
        }
    }

    /// Creates a violation that belongs to the collection as a whole.
    pub fn collection(reason: impl Into<String>) -> Self {
        Self {
            entry: None,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entry {
            Some(entry) => write!(f, "entry {entry}: {}", self.reason),
            None => f.write_str(&self.reason),
        }
    }
}

/// Every violation found in one validation pass.
///
/// Validation never stops at the first problem, so callers can report all of
/// them at once.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", summarize(.violations))]
pub struct ValidationError {
    /// The violations, in entry order.
    pub violations: Vec<Violation>,
}

impl ValidationError {
    /// Returns `Ok` when `violations` is empty, otherwise an error carrying them.
    pub fn check(violations: Vec<Violation>) -> Result<(), Self> {
        if violations.is_empty() {
            Ok(())
        } else {
            Err(Self { violations })
        }
    }
}

fn summarize(violations: &[Violation]) -> String {
    let mut out = format!("{} validation error(s)", violations.len());
    for violation in violations {
        out.push_str("; ");
        out.push_str(&violation.to_string());
    }
    out
}
