//! Error types for the ICD dispatch layer
//!
//! This module defines the error types returned by every dispatch operation,
//! including handle validation, driver loading and driver call failures.

use std::fmt;

/// Result type for dispatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Dispatch errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A context handle that is not (or no longer) registered was supplied
    InvalidHandle,

    /// The operation requires an idle context but the context is in use
    ContextBusy,

    /// A cross-context operation was attempted on contexts from different drivers
    IncompatibleDriver,

    /// Driver enumeration was exhausted without creating a context
    NoDriverAvailable,

    /// A driver module failed to load or exposes an incomplete operation table
    DriverLoadError(String),

    /// A driver entry point reported failure
    DriverCallFailed(String),

    /// The operation requires a current context on the calling thread
    NoCurrentContext,

    /// The drawing surface handle is null or otherwise unusable
    InvalidSurface,

    /// No dispatcher has been installed in the process-wide facade
    NotInitialized,

    /// A metadata lock was poisoned by a panicking thread
    LockPoisoned(String),

    /// The calling thread's binding storage is already torn down
    ThreadExiting,
}

impl Error {
    /// Whether the error comes from the caller's arguments or the calling
    /// thread's state rather than from a driver or the registry
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::InvalidHandle
                | Error::ContextBusy
                | Error::IncompatibleDriver
                | Error::NoCurrentContext
                | Error::InvalidSurface
                | Error::ThreadExiting
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidHandle => write!(f, "Invalid context handle"),
            Error::ContextBusy => write!(f, "Context is busy"),
            Error::IncompatibleDriver => write!(f, "Contexts belong to different drivers"),
            Error::NoDriverAvailable => write!(f, "No driver available"),
            Error::DriverLoadError(msg) => write!(f, "Driver load error: {}", msg),
            Error::DriverCallFailed(msg) => write!(f, "Driver call failed: {}", msg),
            Error::NoCurrentContext => write!(f, "No current context"),
            Error::InvalidSurface => write!(f, "Invalid drawing surface"),
            Error::NotInitialized => write!(f, "ICD dispatch not initialized"),
            Error::LockPoisoned(what) => write!(f, "Lock poisoned: {}", what),
            Error::ThreadExiting => write!(f, "Calling thread is exiting"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
