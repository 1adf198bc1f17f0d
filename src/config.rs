//! Report configuration.

use crate::error::{SdbError, Result};
use std::path::PathBuf;

/// Environment variable overriding the patch directory.
pub const PATCH_DIR_ENV: &str = "SDB_PATCH_DIR";

/// Default indentation of the XML report, in spaces.
pub const DEFAULT_INDENT: usize = 2;

/// How binary payloads are rendered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Binary tags carry only their type attribute.
    #[default]
    Inline,
    /// Binary payloads are embedded as base64 text.
    Base64,
    /// Binary payloads are written to files in `dir` and referenced by URI.
    Extract {
        /// Directory receiving the extracted files.
        dir: PathBuf,
    },
}

impl OutputMode {
    /// Builds a mode from the command-line flags.
    ///
    /// # Errors
    ///
    /// Returns a usage error when both flags are set.
    pub fn from_flags(base64: bool, extract: bool, dir: impl Into<PathBuf>) -> Result<Self> {
        match (base64, extract) {
            (true, true) => Err(SdbError::Usage(
                "Only one of --base64 or --extract can be specified.".to_string(),
            )),
            (true, false) => Ok(Self::Base64),
            (false, true) => Ok(Self::Extract { dir: dir.into() }),
            (false, false) => Ok(Self::Inline),
        }
    }

    /// Returns true in extraction mode.
    pub fn is_extract(&self) -> bool {
        matches!(self, Self::Extract { .. })
    }
}

/// Options controlling report generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportOptions {
    /// Payload rendering.
    pub mode: OutputMode,
    /// Spaces per nesting level; 0 writes the report on one line.
    pub indent: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            mode: OutputMode::Inline,
            indent: DEFAULT_INDENT,
        }
    }
}

impl ReportOptions {
    /// Options with the given mode and default indentation.
    pub fn with_mode(mode: OutputMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}
