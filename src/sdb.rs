//! Native shim database reader with memory-mapped file support.
//!
//! ## Binary Layout
//!
//! ```text
//! [Header - 12 bytes]
//!   - Major version (u32), minor version (u32)
//!   - Magic: "sdbf"
//!
//! [Tags - until end of file]
//!   [Type code - u16]
//!   [Data]
//!     - NULL/BYTE/WORD/DWORD/QWORD/STRINGREF: 0/1/2/4/8/4 bytes
//!     - LIST/STRING/BINARY: u32 size, then `size` bytes
//!       (a LIST's bytes are its child tags)
//! ```
//!
//! A tag id is the absolute offset of the tag. STRINGREF data is an offset
//! relative to the top-level STRINGTABLE list.

use crate::error::{SdbError, Result, ERROR_BAD_FORMAT, ERROR_INVALID_DATA};
use crate::provider::{OpenProvider, Provider, TagId, TAGID_ROOT};
use crate::tag_type::{base, tag_name, tags, BaseType, TagCode, TAG_TYPE_MASK};
use crate::utils::{read_u16_le, read_u32_le, read_u64_le, read_u8, read_utf16_string, slice_at};
use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// Size of the file header in bytes.
pub const SDB_HEADER_SIZE: usize = 12;

/// Expected magic for a valid shim database ("sdbf").
pub const SDB_MAGIC: &[u8; 4] = b"sdbf";

/// Size of a type code.
const TAG_CODE_SIZE: usize = 2;

/// Size of the length prefix of variable-length tags.
const TAG_LENGTH_SIZE: usize = 4;

/// Shim database file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdbHeader {
    /// Major format version.
    pub major_version: u32,

    /// Minor format version.
    pub minor_version: u32,
}

impl SdbHeader {
    /// Parses the header from the start of a database image.
    ///
    /// # Errors
    ///
    /// Returns a provider error with `ERROR_BAD_FORMAT` if the image is too
    /// small or the magic does not match.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < SDB_HEADER_SIZE {
            return Err(SdbError::provider(
                ERROR_BAD_FORMAT,
                format!(
                    "database too small: {} bytes (minimum: {} bytes)",
                    data.len(),
                    SDB_HEADER_SIZE
                ),
            ));
        }

        if &data[8..12] != SDB_MAGIC {
            return Err(SdbError::provider(
                ERROR_BAD_FORMAT,
                format!("invalid signature: expected {:?}, found {:?}", SDB_MAGIC, &data[8..12]),
            ));
        }

        Ok(Self {
            major_version: read_u32_le(data, 0).unwrap_or_default(),
            minor_version: read_u32_le(data, 4).unwrap_or_default(),
        })
    }
}

/// Database image - either memory-mapped or owned.
enum SdbData {
    /// Memory-mapped file data.
    Mapped(Mmap),
    /// Owned data.
    Owned(Vec<u8>),
}

impl SdbData {
    fn as_slice(&self) -> &[u8] {
        match self {
            SdbData::Mapped(mmap) => mmap,
            SdbData::Owned(data) => data,
        }
    }
}

/// A shim database read directly from its on-disk image.
pub struct SdbFile {
    /// `None` once closed.
    data: Option<SdbData>,

    header: SdbHeader,

    /// Id of the top-level STRINGTABLE list, if present.
    string_table: Option<TagId>,
}

impl SdbFile {
    /// Opens a shim database file.
    ///
    /// # Errors
    ///
    /// Returns a provider error if the file cannot be opened or mapped, or
    /// is not a shim database.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use sdb_xml::SdbFile;
    ///
    /// let sdb = SdbFile::open("sysmain.sdb").unwrap();
    /// ```
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        info!("Opening shim database");
        let file = File::open(&path).map_err(|e| io_to_provider(e, path.as_ref()))?;

        let file_size = file
            .metadata()
            .map_err(|e| io_to_provider(e, path.as_ref()))?
            .len() as usize;
        if file_size < SDB_HEADER_SIZE {
            return Err(SdbError::provider(
                ERROR_BAD_FORMAT,
                format!("database too small: {} bytes", file_size),
            ));
        }

        // SAFETY: the file is opened read-only, its size has been validated,
        // the mapping lives exactly as long as this SdbFile and every access
        // goes through the bounds-checked readers in `utils`.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| io_to_provider(e, path.as_ref()))?;
        debug!(size = mmap.len(), "Memory mapped database file");

        Self::from_data(SdbData::Mapped(mmap))
    }

    /// Creates a reader over an owned database image.
    pub fn from_vec(data: Vec<u8>) -> Result<Self> {
        Self::from_data(SdbData::Owned(data))
    }

    fn from_data(data: SdbData) -> Result<Self> {
        let header = SdbHeader::parse(data.as_slice())?;
        let mut sdb = Self {
            data: Some(data),
            header,
            string_table: None,
        };
        sdb.string_table = sdb.find_first_tag(TAGID_ROOT, tags::STRINGTABLE);
        debug!(
            major = header.major_version,
            minor = header.minor_version,
            string_table = ?sdb.string_table,
            "Parsed database header"
        );
        Ok(sdb)
    }

    /// Returns the file header.
    pub fn header(&self) -> &SdbHeader {
        &self.header
    }

    /// Returns true once the database has been closed.
    pub fn is_closed(&self) -> bool {
        self.data.is_none()
    }

    fn bytes(&self) -> &[u8] {
        self.data.as_ref().map(SdbData::as_slice).unwrap_or(&[])
    }

    /// Type code at `id`, or `None` when out of bounds. The root has no code.
    fn code_at(&self, id: TagId) -> Option<TagCode> {
        if id == TAGID_ROOT {
            return None;
        }
        read_u16_le(self.bytes(), id as usize).map(|code| code as TagCode)
    }

    /// Size of the data of the tag at `id`.
    fn size_at(&self, id: TagId, code: TagCode) -> Option<usize> {
        let base_type = BaseType::of(code);
        match base_type.fixed_size() {
            Some(size) => Some(size as usize),
            None if base_type.is_variable_length() => {
                read_u32_le(self.bytes(), id as usize + TAG_CODE_SIZE).map(|size| size as usize)
            }
            None => None,
        }
    }

    /// Offset of the data of the tag at `id`.
    fn data_offset(id: TagId, code: TagCode) -> usize {
        let header = if BaseType::of(code).is_variable_length() {
            TAG_CODE_SIZE + TAG_LENGTH_SIZE
        } else {
            TAG_CODE_SIZE
        };
        id as usize + header
    }

    /// Encoded size of the whole tag at `id`.
    fn encoded_size(&self, id: TagId) -> Option<usize> {
        let code = self.code_at(id)?;
        let size = self.size_at(id, code)?;
        Some(Self::data_offset(id, code) - id as usize + size)
    }

    /// Byte range holding the children of `parent`.
    fn children_range(&self, parent: TagId) -> Option<(usize, usize)> {
        let len = self.bytes().len();
        if parent == TAGID_ROOT {
            return Some((SDB_HEADER_SIZE, len));
        }

        let code = self.code_at(parent)?;
        if code as u16 & TAG_TYPE_MASK != base::LIST {
            return None;
        }
        let start = Self::data_offset(parent, code);
        let end = start.checked_add(self.size_at(parent, code)?)?;
        Some((start, end.min(len)))
    }

    /// Returns `offset` as a tag id if a type code fits before `end`.
    fn child_at(offset: usize, end: usize) -> Option<TagId> {
        if offset.checked_add(TAG_CODE_SIZE)? <= end {
            TagId::try_from(offset).ok()
        } else {
            None
        }
    }

    /// Ensures the tag at `id` has the expected base type.
    ///
    /// Returns `Ok(None)` when the tag cannot be read at all.
    fn checked_code(&self, id: TagId, expected: u16) -> Result<Option<TagCode>> {
        match self.code_at(id) {
            None => Ok(None),
            Some(code) if code as u16 & TAG_TYPE_MASK == expected => Ok(Some(code)),
            Some(code) => Err(SdbError::TypeMismatch {
                id,
                expected,
                found: code as u16,
            }),
        }
    }

    fn string_data(&self, id: TagId, code: TagCode) -> Option<&[u8]> {
        let size = self.size_at(id, code)?;
        slice_at(self.bytes(), Self::data_offset(id, code), size)
    }
}

impl Provider for SdbFile {
    fn first_child(&self, parent: TagId) -> Option<TagId> {
        let (start, end) = self.children_range(parent)?;
        Self::child_at(start, end)
    }

    fn next_child(&self, parent: TagId, prev: TagId) -> Option<TagId> {
        let (_, end) = self.children_range(parent)?;
        let next = (prev as usize).checked_add(self.encoded_size(prev)?)?;
        Self::child_at(next, end)
    }

    fn find_first_tag(&self, parent: TagId, code: TagCode) -> Option<TagId> {
        let mut child = self.first_child(parent);
        while let Some(id) = child {
            if self.code_at(id) == Some(code) {
                return Some(id);
            }
            child = self.next_child(parent, id);
        }
        None
    }

    fn tag_name(&self, code: TagCode) -> String {
        tag_name(code).to_string()
    }

    fn tag_code(&self, id: TagId) -> TagCode {
        self.code_at(id).unwrap_or(0)
    }

    fn read_byte(&self, id: TagId, default: u8) -> Result<u8> {
        Ok(match self.checked_code(id, base::BYTE)? {
            Some(code) => read_u8(self.bytes(), Self::data_offset(id, code)).unwrap_or(default),
            None => default,
        })
    }

    fn read_word(&self, id: TagId, default: i16) -> Result<i16> {
        Ok(match self.checked_code(id, base::WORD)? {
            Some(code) => read_u16_le(self.bytes(), Self::data_offset(id, code))
                .map(|v| v as i16)
                .unwrap_or(default),
            None => default,
        })
    }

    fn read_dword(&self, id: TagId, default: i32) -> Result<i32> {
        Ok(match self.checked_code(id, base::DWORD)? {
            Some(code) => read_u32_le(self.bytes(), Self::data_offset(id, code))
                .map(|v| v as i32)
                .unwrap_or(default),
            None => default,
        })
    }

    fn read_qword(&self, id: TagId, default: i64) -> Result<i64> {
        Ok(match self.checked_code(id, base::QWORD)? {
            Some(code) => read_u64_le(self.bytes(), Self::data_offset(id, code))
                .map(|v| v as i64)
                .unwrap_or(default),
            None => default,
        })
    }

    fn read_binary(&self, id: TagId, buf: &mut [u8]) -> bool {
        let Some(code) = self.code_at(id) else {
            return false;
        };
        if code as u16 & TAG_TYPE_MASK != base::BINARY {
            return false;
        }
        let Some(size) = self.size_at(id, code) else {
            return false;
        };
        if size > buf.len() {
            return false;
        }
        match slice_at(self.bytes(), Self::data_offset(id, code), size) {
            Some(data) => {
                buf[..size].copy_from_slice(data);
                true
            }
            None => false,
        }
    }

    fn data_size(&self, id: TagId) -> u32 {
        self.code_at(id)
            .and_then(|code| self.size_at(id, code))
            .map(|size| size as u32)
            .unwrap_or(0)
    }

    fn read_string(&self, id: TagId) -> Option<String> {
        let code = self.code_at(id)?;
        match code as u16 & TAG_TYPE_MASK {
            base::STRING => read_utf16_string(self.string_data(id, code)?),
            base::STRINGREF => {
                let table = self.string_table?;
                let offset = read_u32_le(self.bytes(), Self::data_offset(id, code))?;
                let item = table.checked_add(offset)?;
                let item_code = self.code_at(item)?;
                if item_code as u16 & TAG_TYPE_MASK != base::STRING {
                    debug!(id, item, "String reference does not point at a string");
                    return None;
                }
                read_utf16_string(self.string_data(item, item_code)?)
            }
            _ => None,
        }
    }

    fn close(&mut self) {
        if self.data.take().is_some() {
            debug!("Released database image");
        }
    }
}

impl OpenProvider for SdbFile {
    fn open(path: &Path) -> Result<Self> {
        SdbFile::open(path)
    }

    fn patch_directory() -> Option<PathBuf> {
        ["WINDIR", "SystemRoot"]
            .iter()
            .find_map(std::env::var_os)
            .map(|windir| PathBuf::from(windir).join("AppPatch"))
    }
}

fn io_to_provider(err: std::io::Error, path: &Path) -> SdbError {
    SdbError::provider(
        err.raw_os_error().unwrap_or(ERROR_INVALID_DATA),
        format!("{}: {}", path.display(), err),
    )
}
