//! Error types for the blend engine

use serde::{Deserialize, Serialize};

/// Recoverable failures reported to the immediate caller.
/// No variant leaves engine state partially mutated.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum BlendError {
    /// No live state carries this name
    #[error("State not found: {name}")]
    NotFound { name: String },

    /// A live state already carries this name
    #[error("A state named {name} already exists")]
    DuplicateName { name: String },

    /// Clip id was never loaded into the engine
    #[error("Clip not loaded: {id}")]
    UnknownClip { id: u32 },

    /// Handle refers to a removed or reused slot
    #[error("State handle for slot {slot} is no longer valid")]
    InvalidHandle { slot: usize },

    /// Weights must be non-negative
    #[error("Weights cannot be negative: {weight}")]
    NegativeWeight { weight: f32 },

    #[error("Illegal argument: {reason}")]
    IllegalArgument { reason: String },

    /// States were added or removed after a cursor was taken
    #[error("The state collection has been modified; this cursor is invalid")]
    CollectionModified,
}

impl BlendError {
    pub(crate) fn not_found(name: &str) -> Self {
        Self::NotFound {
            name: name.to_string(),
        }
    }

    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotFound { .. } | Self::UnknownClip { .. } => "lookup",
            Self::DuplicateName { .. }
            | Self::NegativeWeight { .. }
            | Self::IllegalArgument { .. } => "validation",
            Self::InvalidHandle { .. } | Self::CollectionModified => "stale",
        }
    }
}

pub type Result<T> = std::result::Result<T, BlendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_categories() {
        assert_eq!(BlendError::not_found("walk").category(), "lookup");
        assert_eq!(
            BlendError::NegativeWeight { weight: -1.0 }.category(),
            "validation"
        );
        assert_eq!(BlendError::CollectionModified.category(), "stale");
    }

    #[test]
    fn error_messages_name_the_state() {
        let err = BlendError::DuplicateName {
            name: "run".into(),
        };
        assert_eq!(err.to_string(), "A state named run already exists");
    }

    #[test]
    fn serialization() {
        let error = BlendError::InvalidHandle { slot: 3 };
        let serialized = serde_json::to_string(&error).unwrap();
        let deserialized: BlendError = serde_json::from_str(&serialized).unwrap();
        assert_eq!(error, deserialized);
    }
}
