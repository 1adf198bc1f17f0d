//! Opened shim databases.

use crate::error::{SdbError, Result};
use crate::provider::{OpenProvider, Provider};
use crate::tag::Tag;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Resolves a database path.
///
/// The path is used as given if it exists; otherwise it is retried relative
/// to `patch_dir`. The error carries the original path.
pub fn resolve_path(path: &Path, patch_dir: Option<&Path>) -> Result<PathBuf> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }

    if let Some(dir) = patch_dir {
        let candidate = dir.join(path);
        debug!(candidate = %candidate.display(), "Trying patch directory");
        if candidate.is_file() {
            return Ok(candidate);
        }
    }

    Err(SdbError::not_found(path))
}

/// An open shim database.
///
/// The provider is released exactly once: by [`ShimDatabase::close`] or,
/// failing that, when the database is dropped.
pub struct ShimDatabase<P: Provider> {
    provider: P,
    path: PathBuf,
    closed: bool,
}

impl<P: OpenProvider> ShimDatabase<P> {
    /// Opens a database, falling back to the provider's patch directory.
    ///
    /// # Errors
    ///
    /// Returns [`SdbError::NotFound`] if the path cannot be resolved, or the
    /// provider's error if it fails to open the file.
    pub fn open<T: AsRef<Path>>(path: T) -> Result<Self> {
        Self::open_with_patch_dir(path, P::patch_directory().as_deref())
    }

    /// Opens a database, resolving relative to the given patch directory.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open_with_patch_dir<T: AsRef<Path>>(path: T, patch_dir: Option<&Path>) -> Result<Self> {
        let resolved = resolve_path(path.as_ref(), patch_dir)?;
        info!(resolved = %resolved.display(), "Opening shim database");
        let provider = P::open(&resolved)?;
        Ok(Self::from_provider(provider, resolved))
    }
}

impl<P: Provider> ShimDatabase<P> {
    /// Wraps an already open provider.
    pub fn from_provider(provider: P, path: impl Into<PathBuf>) -> Self {
        Self {
            provider,
            path: path.into(),
            closed: false,
        }
    }

    /// The resolved path of the database.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The root tag.
    pub fn root(&self) -> Tag<'_> {
        Tag::root(&self.provider)
    }

    /// The underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Returns true once the provider has been released.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Releases the provider. Repeated calls do nothing.
    pub fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.provider.close();
            debug!(path = %self.path.display(), "Closed shim database");
        }
    }
}

impl<P: Provider> Drop for ShimDatabase<P> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_resolve_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("app.sdb");
        fs::write(&file, b"x").unwrap();
        assert_eq!(resolve_path(&file, None).unwrap(), file);
    }

    #[test]
    fn test_resolve_against_patch_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("sysmain.sdb"), b"x").unwrap();
        let resolved = resolve_path(Path::new("sysmain.sdb"), Some(dir.path())).unwrap();
        assert_eq!(resolved, dir.path().join("sysmain.sdb"));
    }

    #[test]
    fn test_resolve_not_found_keeps_original() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_path(Path::new("missing.sdb"), Some(dir.path())).unwrap_err();
        match err {
            SdbError::NotFound { path } => assert_eq!(path, PathBuf::from("missing.sdb")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_directory_is_not_a_database() {
        let dir = tempfile::tempdir().unwrap();
        assert!(resolve_path(dir.path(), None).is_err());
    }
}
