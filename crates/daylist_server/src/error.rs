//! Process-level startup and serving errors.

use crate::config::ConfigError;
use daylist_core::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Fatal server errors; any of these terminates the process.
#[derive(Debug)]
pub enum ServerError {
    Config(ConfigError),
    Logging(String),
    /// The task store could not be opened or failed its startup sweep.
    Store(RepoError),
    Io(std::io::Error),
    /// A blocking store call panicked or was cancelled.
    Join(tokio::task::JoinError),
}

impl Display for ServerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::Logging(message) => write!(f, "logging init failed: {message}"),
            Self::Store(err) => write!(f, "task store error: {err}"),
            Self::Io(err) => write!(f, "io error: {err}"),
            Self::Join(err) => write!(f, "blocking task failed: {err}"),
        }
    }
}

impl Error for ServerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Logging(_) => None,
            Self::Store(err) => Some(err),
            Self::Io(err) => Some(err),
            Self::Join(err) => Some(err),
        }
    }
}

impl From<ConfigError> for ServerError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<RepoError> for ServerError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

impl From<std::io::Error> for ServerError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<tokio::task::JoinError> for ServerError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Join(value)
    }
}
