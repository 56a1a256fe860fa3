//! Error handling types

use thiserror::Error;

/// Result type alias for fallible runtime operations
pub type Result<T> = std::result::Result<T, Error>;

/// Faults raised by the runtime itself, as opposed to resolution outcomes
#[derive(Error, Debug)]
pub enum Error {
    #[error("Runtime error: {message}")]
    Runtime { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl Error {
    /// Create a runtime error
    pub fn runtime<S: Into<String>>(message: S) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

/// Outcome of a failed resolution, encoded as a value rather than a fault.
///
/// A miss or a detected cycle is a normal, recoverable result; escalating
/// either to a hard failure is the caller's decision.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveError {
    /// No factory is registered for the requested type.
    #[error("no factory registered for `{type_name}`")]
    NotRegistered { type_name: &'static str },

    /// The requested type is already being resolved on this chain.
    #[error("circular dependency while resolving `{type_name}`")]
    CircularDependency { type_name: &'static str },

    /// The erased slot produced a value of an unexpected type.
    ///
    /// Fails closed: surfaced as a distinct miss-like outcome, never UB.
    #[error("registry slot for `{type_name}` produced a mismatched value")]
    TypeMismatch { type_name: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_message() {
        let err = Error::runtime("no tokio runtime");
        assert!(err.to_string().contains("no tokio runtime"));
    }

    #[test]
    fn resolve_error_display_names_the_type() {
        let err = ResolveError::NotRegistered { type_name: "u32" };
        assert!(err.to_string().contains("u32"));
        let err = ResolveError::CircularDependency { type_name: "Svc" };
        assert!(err.to_string().contains("circular"));
    }
}
