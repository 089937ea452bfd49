use serde::Serialize;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Usage,
    Network,
    Server,
    Sync,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    Usage = 2,
    Sync = 4,
    Network = 5,
    Io = 6,
    Server = 7,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[error("{message}")]
pub struct MealError {
    pub kind: ErrorKind,
    pub message: String,
}

impl MealError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Usage, message)
    }

    /// Transport-level failure: the request never got an HTTP response.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn server(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Server, message)
    }

    pub fn sync(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Sync, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn is_connectivity(&self) -> bool {
        self.kind == ErrorKind::Network
    }

    pub fn exit_code(&self) -> ExitCode {
        match self.kind {
            ErrorKind::Usage => ExitCode::Usage,
            ErrorKind::Network => ExitCode::Network,
            ErrorKind::Server => ExitCode::Server,
            ErrorKind::Sync => ExitCode::Sync,
            ErrorKind::Io => ExitCode::Io,
        }
    }
}

impl From<std::io::Error> for MealError {
    fn from(value: std::io::Error) -> Self {
        Self::io(value.to_string())
    }
}

impl<T: Display> From<(ErrorKind, T)> for MealError {
    fn from((kind, value): (ErrorKind, T)) -> Self {
        Self::new(kind, value.to_string())
    }
}

pub type MealResult<T> = Result<T, MealError>;
