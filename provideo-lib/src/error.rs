use std::io;
use std::time::Duration;
use thiserror::Error;

/// The primary error type for the `provideo-lib` library.
///
/// Every variant maps onto one of the protocol's negative status codes, see
/// [`Error::code`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid protocol handle (connection or instance already released)")]
    Fault,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Operation not supported: {0}")]
    Unsupported(String),

    #[error("Device reported failure{}", .reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    Device { reason: Option<String> },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Parameter count mismatch for '{command}': expected {expected}, got {actual}")]
    ParamCount {
        command: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("No terminal response within {0:?}")]
    Timeout(Duration),

    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    #[error("No device present. Is the camera connected and powered?")]
    NoDevice,
}

pub type Result<T> = std::result::Result<T, Error>;

// errno values the status codes are modelled on
const EIO: i32 = 5;
const ENOMEM: i32 = 12;
const EFAULT: i32 = 14;
const ENODEV: i32 = 19;
const EINVAL: i32 = 22;
const EPROTO: i32 = 71;
const EOPNOTSUPP: i32 = 95;
const ETIMEDOUT: i32 = 110;

impl Error {
    /// Negative status code of this error.
    pub fn code(&self) -> i32 {
        match self {
            Error::Fault => -EFAULT,
            Error::InvalidArgument(_) => -EINVAL,
            Error::Unsupported(_) => -EOPNOTSUPP,
            Error::Device { .. } | Error::Io(_) => -EIO,
            Error::Protocol(_) | Error::ParamCount { .. } => -EPROTO,
            Error::Timeout(_) => -ETIMEDOUT,
            Error::OutOfMemory(_) => -ENOMEM,
            Error::NoDevice => -ENODEV,
        }
    }

    /// Build the error for a failure line reported by the device.
    ///
    /// Reasons naming a bad value or an unknown command get their specific
    /// status; anything else is a plain device I/O failure.
    pub fn from_device_reason(reason: Option<String>) -> Self {
        let Some(reason) = reason.filter(|r| !r.is_empty()) else {
            return Error::Device { reason: None };
        };
        let lower = reason.to_ascii_lowercase();
        if lower.contains("out of range") || lower.contains("invalid") {
            Error::InvalidArgument(reason)
        } else if lower.contains("unknown command") || lower.contains("not supported") {
            Error::Unsupported(reason)
        } else {
            Error::Device { reason: Some(reason) }
        }
    }

    pub(crate) fn unsupported(family: impl std::fmt::Display, operation: &str) -> Self {
        Error::Unsupported(format!("{operation} is not implemented by the {family} driver"))
    }
}
