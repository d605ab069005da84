use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeckhandError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Backend error: {0}")]
    BackendError(#[from] anyhow::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Duplicate resource name: {0}")]
    DuplicateNameError(String),

    #[error("Resource not found: {0}")]
    NotFoundError(String),

    #[error("Unknown labware model: {0}")]
    UnknownModelError(String),

    #[error("Invalid rail {rail}: {reason}")]
    InvalidRailError { rail: i32, reason: String },

    #[error("Invalid slot {slot}: {reason}")]
    InvalidSlotError { slot: String, reason: String },

    #[error("{slot} is already occupied by '{by}'")]
    OccupiedSlotError { slot: String, by: String },

    #[error("Layout parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    #[error("Operation not supported by this backend: {0}")]
    UnsupportedOperationError(String),

    #[error("Invalid operation: {message}")]
    InvalidOperationError { message: String },

    #[error("Invalid handler state: {message}")]
    StateError { message: String },
}

pub type Result<T> = std::result::Result<T, DeckhandError>;
