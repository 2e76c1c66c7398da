//! Error types for Fraguar operations.
//!
//! One crate-wide enum covers the whole pipeline: linear-algebra failures,
//! invalid hyperparameters, schema violations during ingestion, cluster-count
//! search coming up empty, and registry lookups that miss.

use std::fmt;

/// Main error type for Fraguar operations.
///
/// # Examples
///
/// ```
/// use fraguar::error::FraguarError;
///
/// let err = FraguarError::DimensionMismatch {
///     expected: "300x8".to_string(),
///     actual: "300x5".to_string(),
/// };
/// assert!(err.to_string().contains("dimension mismatch"));
/// ```
#[derive(Debug)]
pub enum FraguarError {
    /// Matrix/vector dimensions don't match for the operation.
    DimensionMismatch {
        /// Expected dimensions description
        expected: String,
        /// Actual dimensions found
        actual: String,
    },

    /// Invalid hyperparameter value provided.
    InvalidHyperparameter {
        /// Parameter name
        param: String,
        /// Provided value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Input file or table does not match the declared schema.
    SchemaViolation {
        /// What was violated
        message: String,
    },

    /// The inertia curve had no usable elbow point.
    NoKneeFound {
        /// Largest cluster count that was tried
        max_clusters: usize,
    },

    /// No persisted model matches the requested tag.
    ModelNotFound {
        /// Tag that was searched for
        tag: String,
    },

    /// I/O error (file not found, permission denied, etc.).
    Io(std::io::Error),

    /// Serialization/deserialization error.
    Serialization(String),

    /// Generic error with string message.
    Other(String),
}

impl fmt::Display for FraguarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FraguarError::DimensionMismatch { expected, actual } => {
                write!(f, "dimension mismatch: expected {expected}, got {actual}")
            }
            FraguarError::InvalidHyperparameter {
                param,
                value,
                constraint,
            } => {
                write!(
                    f,
                    "Invalid hyperparameter: {param} = {value}, expected {constraint}"
                )
            }
            FraguarError::SchemaViolation { message } => {
                write!(f, "Schema violation: {message}")
            }
            FraguarError::NoKneeFound { max_clusters } => {
                write!(
                    f,
                    "No elbow found in inertia curve for cluster counts 1..={max_clusters}"
                )
            }
            FraguarError::ModelNotFound { tag } => {
                write!(f, "No persisted model found for tag '{tag}'")
            }
            FraguarError::Io(e) => write!(f, "I/O error: {e}"),
            FraguarError::Serialization(msg) => write!(f, "Serialization error: {msg}"),
            FraguarError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for FraguarError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FraguarError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FraguarError {
    fn from(err: std::io::Error) -> Self {
        FraguarError::Io(err)
    }
}

impl From<&str> for FraguarError {
    fn from(msg: &str) -> Self {
        FraguarError::Other(msg.to_string())
    }
}

impl From<String> for FraguarError {
    fn from(msg: String) -> Self {
        FraguarError::Other(msg)
    }
}

impl From<serde_json::Error> for FraguarError {
    fn from(err: serde_json::Error) -> Self {
        FraguarError::Serialization(err.to_string())
    }
}

impl FraguarError {
    /// Create an empty input error
    #[must_use]
    pub fn empty_input(context: &str) -> Self {
        Self::Other(format!("empty input: {context}"))
    }
}

/// Convenience type alias for Results.
pub type Result<T> = std::result::Result<T, FraguarError>;
