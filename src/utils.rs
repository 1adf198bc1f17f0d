//! Bounds-checked little-endian readers over a database image.
//!
//! Every reader returns `None` instead of panicking when the requested range
//! falls outside `data`.

use byteorder::{ByteOrder, LittleEndian};
use encoding_rs::UTF_16LE;

/// Returns `len` bytes at `offset`, if they are all in bounds.
pub fn slice_at(data: &[u8], offset: usize, len: usize) -> Option<&[u8]> {
    let end = offset.checked_add(len)?;
    data.get(offset..end)
}

/// Reads a u8 at the given offset.
pub fn read_u8(data: &[u8], offset: usize) -> Option<u8> {
    data.get(offset).copied()
}

/// Reads a u16 at the given offset.
pub fn read_u16_le(data: &[u8], offset: usize) -> Option<u16> {
    slice_at(data, offset, 2).map(LittleEndian::read_u16)
}

/// Reads a u32 at the given offset.
pub fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    slice_at(data, offset, 4).map(LittleEndian::read_u32)
}

/// Reads a u64 at the given offset.
pub fn read_u64_le(data: &[u8], offset: usize) -> Option<u64> {
    slice_at(data, offset, 8).map(LittleEndian::read_u64)
}

/// Decodes a UTF-16LE string, trimming null terminators.
///
/// Returns `None` for an odd byte count or malformed UTF-16.
pub fn read_utf16_string(data: &[u8]) -> Option<String> {
    if data.is_empty() {
        return Some(String::new());
    }

    // UTF-16 requires even number of bytes
    if data.len() % 2 != 0 {
        return None;
    }

    let (decoded, _encoding, had_errors) = UTF_16LE.decode(data);
    if had_errors {
        return None;
    }

    Some(decoded.trim_end_matches('\0').to_string())
}
