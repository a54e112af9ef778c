//! Unified error handling for cubekit
//!
//! One error type covers every stage of an export run. Some variants are
//! recoverable: they describe quality problems (a texture that is too small,
//! an animation without motion) and travel next to a usable result inside
//! [`Diagnosed`] instead of aborting the run.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which identifier namespace a duplicate was found in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierKind {
    Bone,
    Locator,
    Animation,
}

impl fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierKind::Bone => write!(f, "bone"),
            IdentifierKind::Locator => write!(f, "locator"),
            IdentifierKind::Animation => write!(f, "animation"),
        }
    }
}

/// Unified error type for all cubekit operations
#[derive(Error, Debug)]
pub enum Error {
    // ==================== I/O Errors ====================

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Encoding or decoding a document failed
    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
    },

    // ==================== Scene Errors ====================

    /// Malformed scene graph (missing pivot, parent cycle, negative cube)
    #[error("Invalid scene structure: {message}")]
    Structure {
        message: String,
    },

    // ==================== UV Errors ====================

    /// The packed UV layout does not fit the texture
    #[error(
        "UV layout needs {required_width}x{required_height} pixels but the texture is {texture_width}x{texture_height}"
    )]
    UvOverflow {
        required_width: u32,
        required_height: u32,
        texture_width: u32,
        texture_height: u32,
    },

    // ==================== Model Errors ====================

    /// Two entities in the same namespace share a name
    #[error("Duplicate {kind} identifier: {name}")]
    DuplicateIdentifier {
        kind: IdentifierKind,
        name: String,
    },

    /// A bone names a parent that is not part of the tree
    #[error("Bone {bone} references missing parent {parent}")]
    DanglingReference {
        bone: String,
        parent: String,
    },

    // ==================== Animation Errors ====================

    /// Frame range is empty or the step is zero
    #[error("Empty frame range: {start}..={end} (step {step})")]
    EmptyRange {
        start: i32,
        end: i32,
        step: u32,
    },

    /// No channel of the animation produced a keyframe
    #[error("Animation {animation} has no animated channels")]
    NoAnimatedChannels {
        animation: String,
    },

    // ==================== Document Errors ====================

    /// A document does not match the expected schema
    #[error("Invalid document at {path}: {message}")]
    InvalidDocument {
        path: String,
        message: String,
    },

    /// Unsupported format version
    #[error("Unsupported format version: {version} (supported: {supported})")]
    UnsupportedVersion {
        version: String,
        supported: String,
    },

    // ==================== Configuration Errors ====================

    /// Invalid configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        message: String,
    },

    // ==================== General Errors ====================

    /// Export cancelled at a stage boundary
    #[error("Operation cancelled")]
    Cancelled,

    /// Custom error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },

    /// Multiple errors occurred
    #[error("Multiple errors occurred: {0:?}")]
    Multiple(Vec<Error>),
}

/// Result type using the unified Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an error with additional context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a scene structure error
    pub fn structure(message: impl Into<String>) -> Self {
        Error::Structure {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Error::Serialization {
            message: message.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Error::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an invalid document error
    pub fn invalid_document(path: impl Into<String>, message: impl Into<String>) -> Self {
        Error::InvalidDocument {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Strip context wrappers and return the underlying error
    pub fn root(&self) -> &Error {
        match self {
            Error::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check whether the export can go on after this error.
    ///
    /// Recoverable errors are reported as warnings next to a valid result.
    pub fn is_recoverable(&self) -> bool {
        match self.root() {
            Error::UvOverflow { .. } | Error::NoAnimatedChannels { .. } => true,
            Error::Multiple(errors) => errors.iter().all(Error::is_recoverable),
            _ => false,
        }
    }

    /// Check if this error invalidates the structure of a document
    pub fn is_schema_error(&self) -> bool {
        matches!(
            self.root(),
            Error::Structure { .. }
                | Error::DuplicateIdentifier { .. }
                | Error::DanglingReference { .. }
                | Error::InvalidDocument { .. }
                | Error::UnsupportedVersion { .. }
        )
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

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

/// A value produced together with the recoverable problems found on the way
#[derive(Debug)]
pub struct Diagnosed<T> {
    pub value: T,
    pub warnings: Vec<Error>,
}

impl<T> Diagnosed<T> {
    /// Wrap a value without warnings
    pub fn clean(value: T) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }

    /// Wrap a value with warnings
    pub fn with_warnings(value: T, warnings: Vec<Error>) -> Self {
        Self { value, warnings }
    }

    /// Append a warning
    pub fn warn(&mut self, warning: Error) {
        self.warnings.push(warning);
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Transform the value and keep the warnings
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Diagnosed<U> {
        Diagnosed {
            value: f(self.value),
            warnings: self.warnings,
        }
    }

    /// Move the warnings into `sink` and return the bare value
    pub fn drain_into(self, sink: &mut Vec<Error>) -> T {
        sink.extend(self.warnings);
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_with_context() {
        let err = Error::structure("bone body has no pivot");
        let contextualized = err.with_context("while building scene");

        assert!(contextualized.to_string().contains("while building scene"));
        assert!(contextualized.to_string().contains("no pivot"));
    }

    #[test]
    fn test_recoverable_classification() {
        let overflow = Error::UvOverflow {
            required_width: 64,
            required_height: 80,
            texture_width: 64,
            texture_height: 64,
        };
        assert!(overflow.is_recoverable());
        assert!(Error::NoAnimatedChannels { animation: "idle".into() }.is_recoverable());
        assert!(!Error::structure("cycle").is_recoverable());
        assert!(!Error::EmptyRange { start: 5, end: 1, step: 1 }.is_recoverable());
    }

    #[test]
    fn test_context_keeps_classification() {
        let err = Error::DanglingReference {
            bone: "arm".into(),
            parent: "torso".into(),
        }
        .with_context("serializing model");

        assert!(err.is_schema_error());
        assert!(!err.is_recoverable());
        assert!(matches!(err.root(), Error::DanglingReference { .. }));
    }

    #[test]
    fn test_result_context() {
        let result: Result<()> = Err(Error::FileNotFound(PathBuf::from("/scene.yaml")));
        let with_context = result.context("loading scene");

        assert!(with_context.is_err());
        assert!(with_context.unwrap_err().to_string().contains("loading scene"));
    }

    #[test]
    fn test_diagnosed_drain() {
        let mut sink = Vec::new();
        let mut diagnosed = Diagnosed::clean(3);
        diagnosed.warn(Error::NoAnimatedChannels { animation: "walk".into() });

        let value = diagnosed.map(|v| v * 2).drain_into(&mut sink);
        assert_eq!(value, 6);
        assert_eq!(sink.len(), 1);
    }
}
