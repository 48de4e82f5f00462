use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc::error::SendError as TokioSendError;

use crate::event::ChangeEvent;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum LogosError {
    #[error("Proof cache error: {0}")]
    Cache(String),
    #[error("Custom error: {0}")]
    Custom(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Listener error: {0}")]
    Listener(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("Reasoning source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("Conclusion type not supported by the reasoning source: {0}")]
    UnsupportedConclusion(String),
}

impl LogosError {
    /// `true` for failures a later `get_proof` call may clear by retrying from
    /// scratch; `false` for failures that are stable until the configuration
    /// changes (unsupported conclusion kinds in particular).
    pub fn is_transient(&self) -> bool {
        !matches!(self, LogosError::UnsupportedConclusion(_))
    }
}

impl From<toml::de::Error> for LogosError {
    fn from(src: toml::de::Error) -> LogosError {
        LogosError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for LogosError {
    fn from(src: toml::ser::Error) -> LogosError {
        LogosError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<uuid::Error> for LogosError {
    fn from(src: uuid::Error) -> LogosError {
        LogosError::Serialization(format!("UUID conversion failed: {src}"))
    }
}

impl From<io::Error> for LogosError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => LogosError::NotFound(format!("{x}")),
            _ => LogosError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

impl From<TokioSendError<ChangeEvent>> for LogosError {
    fn from(x: TokioSendError<ChangeEvent>) -> Self {
        LogosError::Io(format!(
            "Channel send error, could not transmit change event {:?}",
            x.0
        ))
    }
}
