//! Error types for LiveDiff core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in LiveDiff core operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A key path string or property expression is malformed.
    ///
    /// Raised synchronously when the key path is constructed.
    #[error("invalid key path: {message}")]
    Configuration {
        /// Description of the problem.
        message: String,
    },

    /// A key path references a property that cannot be used.
    ///
    /// Raised at subscribe time, when the key path is resolved against
    /// the schema of the collection's element type.
    #[error("{message}")]
    Argument {
        /// Full description, naming the property and the declaring type.
        message: String,
        /// The offending property name.
        property: String,
        /// The type the property was looked up on.
        type_name: String,
    },

    /// Operation not permitted in current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why operation is invalid.
        message: String,
    },

    /// The lineage is not known to the data source.
    #[error("collection lineage not found: {lineage}")]
    LineageNotFound {
        /// The lineage id that was looked up.
        lineage: u64,
    },

    /// An object referenced by a write does not exist.
    #[error("object not found: {object_id}")]
    ObjectNotFound {
        /// The missing object, formatted.
        object_id: String,
    },

    /// The data source failed to answer a request.
    #[error("data source error: {message}")]
    Source {
        /// Description of the failure.
        message: String,
    },
}

impl CoreError {
    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an error for a property that does not exist on a type.
    pub fn unknown_property(property: impl Into<String>, type_name: impl Into<String>) -> Self {
        let property = property.into();
        let type_name = type_name.into();
        Self::Argument {
            message: format!("Property '{property}' does not exist on type '{type_name}'"),
            property,
            type_name,
        }
    }

    /// Creates an error for a scalar property used as if it were traversable.
    pub fn not_traversable(property: impl Into<String>, type_name: impl Into<String>) -> Self {
        let property = property.into();
        let type_name = type_name.into();
        Self::Argument {
            message: format!(
                "Property '{property}' on type '{type_name}' is not a link or a collection \
                 and cannot be followed in a key path"
            ),
            property,
            type_name,
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Creates a data source error.
    pub fn source(message: impl Into<String>) -> Self {
        Self::Source {
            message: message.into(),
        }
    }

    /// Returns true for errors caused by a bad key path.
    pub fn is_key_path_error(&self) -> bool {
        matches!(self, Self::Configuration { .. } | Self::Argument { .. })
    }
}
