//! Naming and writing of extracted binary payloads.

use crate::error::Result;
use crate::tag::Tag;
use crate::tag_type::{tags, SemanticKind, CONTAINER_TAGS};
use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Extension of synthesized file names.
pub const EXTRACTED_EXTENSION: &str = "bin";

/// Chooses file names for extracted payloads within one report.
#[derive(Debug, Default)]
pub struct FileNamer {
    used: HashSet<String>,
}

impl FileNamer {
    /// Creates a namer with no names used yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the file name for a binary tag.
    ///
    /// A file reference inside a FILE, PATCH or DATA container is named by
    /// the container's NAME; anything else gets a random `.bin` name that
    /// has not been handed out before.
    pub fn file_name(&mut self, tag: &Tag<'_>) -> Result<String> {
        if let Some(name) = container_file_name(tag)? {
            if !self.used.insert(name.clone()) {
                warn!(name = %name, "Extracted file name used more than once");
            }
            return Ok(name);
        }
        Ok(self.synthesize())
    }

    fn synthesize(&mut self) -> String {
        loop {
            let name = format!("{}.{}", Uuid::new_v4().simple(), EXTRACTED_EXTENSION);
            if self.used.insert(name.clone()) {
                return name;
            }
        }
    }
}

/// Name given to a file reference by its container, if any.
fn container_file_name(tag: &Tag<'_>) -> Result<Option<String>> {
    if tag.kind() != SemanticKind::FileReference {
        return Ok(None);
    }
    let Some(parent) = tag.parent() else {
        return Ok(None);
    };
    if !CONTAINER_TAGS.contains(&parent.code()) {
        return Ok(None);
    }
    let Some(name_tag) = parent.find(tags::NAME) else {
        return Ok(None);
    };

    let name = name_tag.read_string()?;
    match sanitize_file_name(&name) {
        Some(safe) => Ok(Some(safe.to_string())),
        None => {
            warn!(name = %name, "Ignoring unusable extracted file name");
            Ok(None)
        }
    }
}

/// Reduces a stored name to its final path component.
///
/// Returns `None` when nothing usable is left.
pub fn sanitize_file_name(name: &str) -> Option<&str> {
    let last = name.rsplit(['/', '\\']).next()?.trim();
    let last = last.rsplit(':').next()?;
    match last {
        "" | "." | ".." => None,
        _ => Some(last),
    }
}

/// Writes payloads into an output directory.
#[derive(Debug)]
pub struct Extractor {
    dir: PathBuf,
    namer: FileNamer,
}

impl Extractor {
    /// Creates an extractor writing into `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            namer: FileNamer::new(),
        }
    }

    /// The output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the payload of `tag` and returns the file name used.
    pub fn extract(&mut self, tag: &Tag<'_>, data: &[u8]) -> Result<String> {
        let name = self.namer.file_name(tag)?;
        let path = self.dir.join(&name);
        debug!(path = %path.display(), size = data.len(), "Extracting payload");

        let mut file = File::create(&path)?;
        file.write_all(data)?;
        file.flush()?;
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_keeps_plain_names() {
        assert_eq!(sanitize_file_name("setup.exe"), Some("setup.exe"));
        assert_eq!(sanitize_file_name("my app.dll"), Some("my app.dll"));
    }

    #[test]
    fn test_sanitize_strips_directories() {
        assert_eq!(sanitize_file_name("..\\..\\evil.dll"), Some("evil.dll"));
        assert_eq!(sanitize_file_name("/etc/passwd"), Some("passwd"));
        assert_eq!(sanitize_file_name("C:evil.dll"), Some("evil.dll"));
    }

    #[test]
    fn test_sanitize_rejects_empty() {
        assert_eq!(sanitize_file_name(""), None);
        assert_eq!(sanitize_file_name("dir/"), None);
        assert_eq!(sanitize_file_name(".."), None);
    }

    #[test]
    fn test_synthesized_names_are_unique() {
        let mut namer = FileNamer::new();
        let names: HashSet<String> = (0..1000).map(|_| namer.synthesize()).collect();
        assert_eq!(names.len(), 1000);
        assert!(names.iter().all(|n| n.ends_with(".bin") && n.len() == 36));
    }
}
