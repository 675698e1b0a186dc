//! Error types for the animation component

use serde::{Deserialize, Serialize};
use simple_animation_core::BlendError;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AnimationError {
    /// Rejected by the blend engine
    #[error(transparent)]
    Blend(#[from] BlendError),

    /// No clip with this name was registered on the component
    #[error("Clip not registered: {name}")]
    UnknownClip { name: String },

    /// A clip with this name is already registered
    #[error("Clip already registered: {name}")]
    DuplicateClip { name: String },
}

impl AnimationError {
    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Blend(inner) => inner.category(),
            Self::UnknownClip { .. } => "lookup",
            Self::DuplicateClip { .. } => "validation",
        }
    }
}

pub type Result<T> = std::result::Result<T, AnimationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_pass_through() {
        let err: AnimationError = BlendError::NotFound {
            name: "walk".into(),
        }
        .into();
        assert_eq!(err.to_string(), "State not found: walk");
        assert_eq!(err.category(), "lookup");
    }
}
