//! Global error handling for ctxscan
//!
//! Only failures that stop a run outright live here. Problems met while
//! walking (unreadable entries, oversize files, timeouts, symlink loops,
//! malformed patterns) are recorded in a [`crate::types::SkipReport`] instead.

use std::io;
use thiserror::Error;

/// Global error type for ctxscan operations
#[derive(Error, Debug)]
pub enum ScanError {
    /// File system errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// XML processing errors
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// JSON processing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Regular expression errors
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// The walk root does not exist or is not a directory
    #[error("Root not found: {0}")]
    RootNotFound(String),

    /// The walk root exists but cannot be listed
    #[error("Root unreadable: {0}")]
    RootUnreadable(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Specialized Result type for ctxscan operations
pub type Result<T> = std::result::Result<T, ScanError>;

/// Creates a ScanError with a formatted message
#[macro_export]
macro_rules! error {
    ($error_type:ident, $($arg:tt)*) => {
        $crate::error::ScanError::$error_type(format!($($arg)*))
    };
}

/// Returns an error result with a formatted message
#[macro_export]
macro_rules! bail {
    ($error_type:ident, $($arg:tt)*) => {
        return Err($crate::error!($error_type, $($arg)*))
    };
}

/// Ensures a condition is true, otherwise returns an error
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $error_type:ident, $($arg:tt)*) => {
        if !($cond) {
            $crate::bail!($error_type, $($arg)*)
        }
    };
}

/// Extension trait for adding context to errors
pub trait ResultExt<T, E> {
    /// Turn any error into a configuration error prefixed with `f()`
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: std::fmt::Display;
}

impl<T, E: std::error::Error + 'static> ResultExt<T, E> for std::result::Result<T, E> {
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> C,
        C: std::fmt::Display,
    {
        self.map_err(|e| {
            let context = f();
            ScanError::Config(format!("{}: {}", context, e))
        })
    }
}

// main() returns io::Result
impl From<ScanError> for io::Error {
    fn from(err: ScanError) -> Self {
        let kind = match &err {
            ScanError::Io(e) => e.kind(),
            ScanError::RootNotFound(_) => io::ErrorKind::NotFound,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn needs_positive(value: u64) -> Result<u64> {
        crate::ensure!(value > 0, InvalidArgument, "value must be positive, got {}", value);
        Ok(value)
    }

    #[test]
    fn test_ensure_macro() {
        assert_eq!(needs_positive(3).unwrap(), 3);
        let err = needs_positive(0).unwrap_err();
        assert_eq!(err.to_string(), "Invalid argument: value must be positive, got 0");
    }

    #[test]
    fn test_root_not_found_maps_to_not_found_kind() {
        let err: io::Error = ScanError::RootNotFound("/nope".to_string()).into();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_with_context() {
        let raw: std::result::Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::Other, "boom"));
        let err = raw.with_context(|| "reading config").unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: reading config: boom");
    }
}
