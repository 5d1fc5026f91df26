//! Error handling for Layered
//!
//! Every handle-related error is a precondition violation: the caller passed a
//! layer handle the container does not currently own. These are programmer
//! errors and are never retried.

use thiserror::Error;
use uuid::Uuid;

use crate::layers::LayerId;

/// Result type alias for Layered operations
pub type Result<T> = std::result::Result<T, LayeredError>;

/// Main error type for Layered operations
#[derive(Error, Debug)]
pub enum LayeredError {
    // Handle Errors
    #[error("Unknown layer {layer}: no such slot in container {container}")]
    UnknownLayer { layer: LayerId, container: Uuid },

    #[error("Stale layer {layer}: it was already removed from container {container}")]
    StaleLayer { layer: LayerId, container: Uuid },

    #[error("Foreign layer {layer}: it belongs to container {owner}, not {container}")]
    ForeignLayer {
        layer: LayerId,
        owner: Uuid,
        container: Uuid,
    },

    #[error("The base layer of container {container} cannot be removed")]
    BaseLayer { container: Uuid },

    #[error("Container {container} was dropped while layer {layer} was still held")]
    ContainerDropped { layer: LayerId, container: Uuid },

    // Script Errors
    #[error("Unknown layer label: {label}")]
    UnknownLabel { label: String },

    #[error("Layer label already attached: {label}")]
    DuplicateLabel { label: String },

    #[error("Invalid script: {reason}")]
    InvalidScript { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LayeredError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            LayeredError::UnknownLayer { .. } => "UNKNOWN_LAYER",
            LayeredError::StaleLayer { .. } => "STALE_LAYER",
            LayeredError::ForeignLayer { .. } => "FOREIGN_LAYER",
            LayeredError::BaseLayer { .. } => "BASE_LAYER",
            LayeredError::ContainerDropped { .. } => "CONTAINER_DROPPED",
            LayeredError::UnknownLabel { .. } => "UNKNOWN_LABEL",
            LayeredError::DuplicateLabel { .. } => "DUPLICATE_LABEL",
            LayeredError::InvalidScript { .. } => "INVALID_SCRIPT",
            LayeredError::Io(_) => "IO_ERROR",
            LayeredError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error was caused by passing a handle the container does not own
    pub fn is_precondition_violation(&self) -> bool {
        matches!(
            self,
            LayeredError::UnknownLayer { .. }
                | LayeredError::StaleLayer { .. }
                | LayeredError::ForeignLayer { .. }
                | LayeredError::BaseLayer { .. }
                | LayeredError::ContainerDropped { .. }
        )
    }

    /// Returns a recovery suggestion for the caller, if one applies.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            LayeredError::StaleLayer { .. } => {
                Some("Each override must be removed exactly once; drop the handle after removing it.")
            }
            LayeredError::ForeignLayer { .. } => {
                Some("Pass the handle back to the container that created it.")
            }
            LayeredError::BaseLayer { .. } => {
                Some("Use set_base_value to change the base instead of removing it.")
            }
            LayeredError::ContainerDropped { .. } => {
                Some("Keep the container alive for as long as its overrides are in use.")
            }
            LayeredError::UnknownLabel { .. } => Some("Add the layer with an 'add' step first."),
            LayeredError::DuplicateLabel { .. } => {
                Some("Remove the attached layer before reusing its label.")
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = LayeredError::BaseLayer {
            container: Uuid::nil(),
        };
        assert_eq!(err.error_code(), "BASE_LAYER");

        let err = LayeredError::UnknownLabel {
            label: "a".to_string(),
        };
        assert_eq!(err.error_code(), "UNKNOWN_LABEL");
    }

    #[test]
    fn test_precondition_classification() {
        let err = LayeredError::BaseLayer {
            container: Uuid::nil(),
        };
        assert!(err.is_precondition_violation());
        assert!(err.recovery_suggestion().is_some());

        let err = LayeredError::InvalidScript {
            reason: "empty".to_string(),
        };
        assert!(!err.is_precondition_violation());
        assert!(err.recovery_suggestion().is_none());
    }
}
