//! Error types for shim database rendering.
//!
//! Every failure the library can report is a variant of [`SdbError`]. Scalar
//! reads never surface here: a missing scalar is recovered with the caller's
//! default. Anything else aborts the whole report.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for shim database operations.
pub type Result<T> = std::result::Result<T, SdbError>;

/// Win32 `ERROR_FILE_NOT_FOUND`.
pub const ERROR_FILE_NOT_FOUND: i32 = 2;

/// Win32 `ERROR_BAD_FORMAT`.
pub const ERROR_BAD_FORMAT: i32 = 11;

/// Win32 `ERROR_INVALID_DATA`.
pub const ERROR_INVALID_DATA: i32 = 13;

/// Win32 `ERROR_INVALID_PARAMETER`.
pub const ERROR_INVALID_PARAMETER: i32 = 87;

/// Errors that can occur while opening or rendering a shim database.
#[derive(Error, Debug)]
pub enum SdbError {
    /// Bad, duplicate or conflicting arguments.
    #[error("{0}")]
    Usage(String),

    /// The database path could not be resolved, even against the patch directory.
    #[error("Shim database not found: {}", path.display())]
    NotFound {
        /// The path as originally given.
        path: PathBuf,
    },

    /// The database provider failed to open or read.
    #[error("Provider error {code}: {message}")]
    Provider {
        /// Provider (Win32-style) error code.
        code: i32,
        /// Description of the failure.
        message: String,
    },

    /// A typed read was attempted against a tag of another base type.
    #[error("Tag {id:#x} has type {found:#06x}, expected base type {expected:#06x}")]
    TypeMismatch {
        /// Tag id.
        id: u32,
        /// Base type the read required.
        expected: u16,
        /// Type code found on the tag.
        found: u16,
    },

    /// Binary content could not be read.
    #[error("Failed to read binary data of tag {id:#x}")]
    BinaryRead {
        /// Tag id.
        id: u32,
    },

    /// String content could not be read.
    #[error("Failed to read string data of tag {id:#x}")]
    StringRead {
        /// Tag id.
        id: u32,
    },

    /// The database produced something that cannot be written as XML.
    #[error("Invalid format: {0}")]
    Format(String),

    /// I/O error while writing the report or an extracted file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// XML writer error.
    #[error("XML error: {0}")]
    Xml(String),
}

impl SdbError {
    /// Creates a provider error with context.
    ///
    /// # Arguments
    ///
    /// * `code` - Win32-style error code
    /// * `message` - Description of the failure
    pub fn provider(code: i32, message: impl Into<String>) -> Self {
        Self::Provider {
            code,
            message: message.into(),
        }
    }

    /// Creates a format error with detailed context.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use sdb_xml::error::SdbError;
    /// let err = SdbError::format_error(format!("Invalid element name {:?}", ""));
    /// ```
    pub fn format_error(message: String) -> Self {
        Self::Format(message)
    }

    /// Creates a not found error for the given (unresolved) path.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    /// Process exit code for this error.
    ///
    /// Provider failures exit with the provider's own code; everything else
    /// exits with 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Provider { code, .. } if *code != 0 => *code,
            _ => 1,
        }
    }
}
