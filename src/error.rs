//! Error types for the gridrl crate

use thiserror::Error;

/// Main error type for the gridrl crate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid {kind} specification '{input}': {reason}")]
    InvalidTileSpec {
        kind: String,
        input: String,
        reason: String,
    },

    #[error("snapshot stream closed by the consumer")]
    StreamClosed,

    #[error("training worker panicked")]
    WorkerPanicked,

    #[error("failed to {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("progress bar template error: {message}")]
    ProgressBarTemplate { message: String },
}

/// Convenience type alias for Results using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Wrap an I/O error with the operation that produced it.
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Error::Io {
            operation: operation.into(),
            source,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io {
            operation: "IO operation".to_string(),
            source,
        }
    }
}
