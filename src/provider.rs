//! The navigation interface of a shim database provider.
//!
//! The provider owns the tree; everything in this crate is a read-only view
//! over it and asks again on every access instead of caching.

use crate::error::Result;
use crate::tag_type::TagCode;
use std::path::{Path, PathBuf};

/// Opaque tag identifier, meaningful only within one open database.
pub type TagId = u32;

/// Id of the root tag.
pub const TAGID_ROOT: TagId = 0;

/// Read operations a shim database provider exposes.
///
/// Navigation returns `None` where the native API returns a null tag id.
pub trait Provider {
    /// Returns the first child of `parent`.
    fn first_child(&self, parent: TagId) -> Option<TagId>;

    /// Returns the child of `parent` following `prev`.
    fn next_child(&self, parent: TagId, prev: TagId) -> Option<TagId>;

    /// Returns the first immediate child of `parent` with the given type code.
    fn find_first_tag(&self, parent: TagId, code: TagCode) -> Option<TagId>;

    /// Maps a type code to its name.
    fn tag_name(&self, code: TagCode) -> String;

    /// Returns the type code of a tag.
    fn tag_code(&self, id: TagId) -> TagCode;

    /// Reads a BYTE tag, or returns `default` if the value is absent.
    fn read_byte(&self, id: TagId, default: u8) -> Result<u8>;

    /// Reads a WORD tag, or returns `default` if the value is absent.
    fn read_word(&self, id: TagId, default: i16) -> Result<i16>;

    /// Reads a DWORD tag, or returns `default` if the value is absent.
    fn read_dword(&self, id: TagId, default: i32) -> Result<i32>;

    /// Reads a QWORD tag, or returns `default` if the value is absent.
    fn read_qword(&self, id: TagId, default: i64) -> Result<i64>;

    /// Fills `buf` with the binary data of a tag. Returns false on failure.
    fn read_binary(&self, id: TagId, buf: &mut [u8]) -> bool;

    /// Returns the byte length of the tag's data.
    fn data_size(&self, id: TagId) -> u32;

    /// Returns a copy of the string data of a STRING or STRINGREF tag.
    fn read_string(&self, id: TagId) -> Option<String>;

    /// Releases the underlying resource. Further reads are undefined.
    fn close(&mut self) {}
}

/// A provider that can be opened from a file path.
pub trait OpenProvider: Provider + Sized {
    /// Opens the database at `path`.
    fn open(path: &Path) -> Result<Self>;

    /// The well-known directory databases are installed into, if any.
    fn patch_directory() -> Option<PathBuf>;
}
