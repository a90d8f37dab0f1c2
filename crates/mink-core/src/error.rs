//! Model error types

use thiserror::Error;

/// Errors reported by object-model operations.
///
/// All errors surface synchronously to the immediate caller. The two
/// permissive write cases (non-writable data slot, accessor without a setter)
/// are defined no-ops, not errors.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Incompatible redefinition of a non-configurable slot, or adding a slot
    /// to a non-extensible object.
    #[error("ConfigurationError: {0}")]
    Configuration(String),

    /// A prototype assignment that would make an object its own ancestor.
    #[error("CycleError: {0}")]
    Cycle(String),

    /// Invoking a non-callable value, or a coercion that cannot produce a
    /// primitive.
    #[error("TypeError: {0}")]
    Type(String),
}

impl ModelError {
    /// Create a configuration error
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a cycle error
    pub fn cycle(msg: impl Into<String>) -> Self {
        Self::Cycle(msg.into())
    }

    /// Create a type error
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::Type(msg.into())
    }
}

impl From<String> for ModelError {
    fn from(s: String) -> Self {
        ModelError::type_error(s)
    }
}

impl From<&str> for ModelError {
    fn from(s: &str) -> Self {
        ModelError::type_error(s)
    }
}

/// Result type for model operations
pub type ModelResult<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_kind() {
        let err = ModelError::configuration("cannot redefine \"k\"");
        assert_eq!(err.to_string(), "ConfigurationError: cannot redefine \"k\"");

        let err = ModelError::cycle("prototype of itself");
        assert!(err.to_string().starts_with("CycleError:"));
    }

    #[test]
    fn test_from_string() {
        fn fails() -> ModelResult<()> {
            Err(String::from("not a function"))?
        }
        assert!(matches!(fails(), Err(ModelError::Type(_))));

        let shorthand: ModelError = "still a type error".into();
        assert!(matches!(shorthand, ModelError::Type(_)));
    }
}
