use std::fmt;

/// Result type for Tenbilac operations
pub type Result<T> = std::result::Result<T, TenbilacError>;

/// Main error type for the Tenbilac library
#[derive(Debug, Clone, PartialEq)]
pub enum TenbilacError {
    /// Tensor shapes that do not fit together
    DimensionMismatch {
        expected: String,
        actual: String,
    },

    /// Input of a rank a layer cannot process
    InputShape(String),

    /// Layer mode other than "sum" or "mult"
    UnknownLayerMode(String),

    /// Activation function name not in the registry
    UnknownActivation(String),

    /// Error function name not in the registry
    UnknownErrorFunction(String),

    /// Invalid parameter value
    InvalidParameter {
        name: String,
        reason: String,
    },

    /// A requested feature that is not available
    NotImplemented(String),

    /// Minibatch larger than the training set
    MinibatchTooLarge {
        size: usize,
        ncases: usize,
    },

    /// IO errors (file operations)
    Io(String),

    /// Serialization/deserialization errors
    Serialization(String),
}

impl fmt::Display for TenbilacError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TenbilacError::DimensionMismatch { expected, actual } => {
                write!(f, "Dimension mismatch: expected {}, got {}", expected, actual)
            }
            TenbilacError::InputShape(msg) => write!(f, "Input shape error: {}", msg),
            TenbilacError::UnknownLayerMode(mode) => write!(f, "Unknown layer mode '{}'", mode),
            TenbilacError::UnknownActivation(name) => {
                write!(f, "Unknown activation function '{}'", name)
            }
            TenbilacError::UnknownErrorFunction(name) => {
                write!(f, "Unknown error function '{}'", name)
            }
            TenbilacError::InvalidParameter { name, reason } => {
                write!(f, "Invalid parameter '{}': {}", name, reason)
            }
            TenbilacError::NotImplemented(what) => write!(f, "Not implemented: {}", what),
            TenbilacError::MinibatchTooLarge { size, ncases } => {
                write!(f, "Cannot select {} among {} cases", size, ncases)
            }
            TenbilacError::Io(msg) => write!(f, "IO error: {}", msg),
            TenbilacError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

impl std::error::Error for TenbilacError {}

impl From<std::io::Error> for TenbilacError {
    fn from(err: std::io::Error) -> Self {
        TenbilacError::Io(err.to_string())
    }
}

impl From<bincode::Error> for TenbilacError {
    fn from(err: bincode::Error) -> Self {
        TenbilacError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for TenbilacError {
    fn from(err: ndarray::ShapeError) -> Self {
        TenbilacError::InputShape(err.to_string())
    }
}

impl From<serde_json::Error> for TenbilacError {
    fn from(err: serde_json::Error) -> Self {
        TenbilacError::Serialization(err.to_string())
    }
}

// Helper functions for common error patterns
impl TenbilacError {
    pub fn dimension_mismatch<S: Into<String>>(expected: S, actual: S) -> Self {
        TenbilacError::DimensionMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn invalid_parameter<S: Into<String>>(name: S, reason: S) -> Self {
        TenbilacError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
