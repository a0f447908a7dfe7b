//! Unified error handling for escn-exporter
//!
//! [`ValidationError`] covers the user-fixable problems that abort an export
//! before anything is written. Everything else (I/O, malformed scene input,
//! broken internal invariants) lives in [`Error`].

use std::path::PathBuf;
use thiserror::Error;

/// User-fixable export failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// No output path was configured
    #[error("Export filepath is not set")]
    MissingFilepath,

    /// The output directory does not exist or cannot be written to
    #[error("Cannot write to export destination: {0}")]
    UnwritableDestination(PathBuf),

    /// A mesh has no vertices left after modifiers were applied
    #[error("Object '{object}' has mesh '{mesh}' with no vertices after modifiers")]
    EmptyGeometry {
        object: String,
        mesh: String,
    },

    /// An object or bone references a data block the scene does not contain
    #[error("'{owner}' references missing {kind} '{name}'")]
    MissingReference {
        owner: String,
        kind: &'static str,
        name: String,
    },

    /// Bone hierarchy contains a parent cycle
    #[error("Armature '{armature}' has a parent cycle through bone '{bone}'")]
    BoneCycle {
        armature: String,
        bone: String,
    },

    /// A material's node tree cannot be translated
    #[error("Material '{material}': {message}")]
    InvalidMaterial {
        material: String,
        message: String,
    },
}

/// Unified error type for all escn-exporter operations
#[derive(Error, Debug)]
pub enum Error {
    // ==================== Validation Errors ====================

    /// User-fixable problem with the scene or the export options
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    // ==================== I/O Errors ====================

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    // ==================== Input Errors ====================

    /// The scene snapshot could not be decoded
    #[error("Invalid scene: {message}")]
    InvalidScene {
        message: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        message: String,
    },

    // ==================== General Errors ====================

    /// Internal invariant violation (should not happen)
    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },

    /// Error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

/// Result type using the unified Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an error with additional context
    #[must_use]
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create an invalid scene error
    pub fn invalid_scene(message: impl Into<String>) -> Self {
        Self::InvalidScene {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// The validation failure behind this error, looking through context wrappers
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            Self::WithContext { source, .. } => source.as_validation(),
            _ => None,
        }
    }

    /// Check if this is a user-fixable validation failure
    pub fn is_validation(&self) -> bool {
        self.as_validation().is_some()
    }

    /// Check if this is an internal invariant violation
    pub fn is_internal(&self) -> bool {
        match self {
            Self::Internal { .. } => true,
            Self::WithContext { source, .. } => source.is_internal(),
            _ => false,
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().with_context(f()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_with_context() {
        let err = Error::FileNotFound(PathBuf::from("/test"));
        let contextualized = err.with_context("while loading scene");

        assert!(contextualized.to_string().contains("while loading scene"));
    }

    #[test]
    fn test_validation_survives_context() {
        let err: Error = ValidationError::MissingFilepath.into();
        let wrapped = err.with_context("exporting");

        assert!(wrapped.is_validation());
        assert_eq!(wrapped.as_validation(), Some(&ValidationError::MissingFilepath));
    }

    #[test]
    fn test_internal_is_not_validation() {
        let err = Error::internal("dangling handle");
        assert!(err.is_internal());
        assert!(!err.is_validation());
    }

    #[test]
    fn test_result_context() {
        let result: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        let with_context = result.context("writing scene");

        assert!(with_context.is_err());
        assert!(with_context.unwrap_err().to_string().contains("writing scene"));
    }
}
