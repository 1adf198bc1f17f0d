//! Tag values and their canonical text forms.
//!
//! [`TagValue::read`] turns a tag into a tagged union once; every conversion
//! after that is a pure function of the variant.

use crate::error::{SdbError, Result};
use crate::tag::Tag;
use crate::tag_type::SemanticKind;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Seconds between 1601-01-01 and 1970-01-01.
const FILETIME_UNIX_DIFF: i64 = 11_644_473_600;

/// FILETIME ticks (100 ns) per second.
const TICKS_PER_SECOND: i64 = 10_000_000;

/// Largest FILETIME that renders as a four-digit year (9999-12-31T23:59:59.9999999Z).
pub const MAX_FILETIME: i64 = 2_650_467_743_999_999_999;

/// Value of a tag, decoded according to its semantic kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagValue {
    /// Unknown base type.
    Empty,
    /// Flag without data.
    Null,
    /// Container; its value is its children.
    List,
    /// 8-bit integer.
    Byte(u8),
    /// 16-bit integer.
    Word(i16),
    /// 32-bit integer.
    Dword(i32),
    /// 64-bit integer.
    Qword(i64),
    /// Windows FILETIME.
    Timestamp(i64),
    /// String content.
    String(String),
    /// Raw GUID bytes.
    Guid([u8; 16]),
    /// Raw bytes, `None` when the provider could not read them.
    Binary(Option<Vec<u8>>),
}

impl TagValue {
    /// Reads the value of a tag.
    ///
    /// Missing scalars read as 0.
    ///
    /// # Errors
    ///
    /// Fails if a scalar has the wrong type, a string cannot be read or a
    /// GUID cannot be read.
    pub fn read(tag: &Tag<'_>) -> Result<Self> {
        Ok(match tag.kind() {
            SemanticKind::Empty => TagValue::Empty,
            SemanticKind::Null => TagValue::Null,
            SemanticKind::List => TagValue::List,
            SemanticKind::Byte => TagValue::Byte(tag.read_byte(0)?),
            SemanticKind::Word => TagValue::Word(tag.read_word(0)?),
            SemanticKind::Dword => TagValue::Dword(tag.read_dword(0)?),
            SemanticKind::Qword => TagValue::Qword(tag.read_qword(0)?),
            SemanticKind::Timestamp => TagValue::Timestamp(tag.read_qword(0)?),
            SemanticKind::String | SemanticKind::StringRef => TagValue::String(tag.read_string()?),
            SemanticKind::Guid => TagValue::Guid(tag.read_binary_array::<16>()?),
            SemanticKind::Binary | SemanticKind::FileReference => {
                TagValue::Binary(tag.read_binary().ok())
            }
        })
    }

    /// Canonical text of the value, if it has one.
    pub fn text(&self) -> Result<Option<String>> {
        Ok(match self {
            TagValue::Byte(v) => Some(v.to_string()),
            TagValue::Word(v) => Some(v.to_string()),
            TagValue::Dword(v) => Some(v.to_string()),
            TagValue::Qword(v) => Some(v.to_string()),
            TagValue::Timestamp(v) => Some(format_filetime(*v)?),
            TagValue::String(s) => Some(s.clone()),
            TagValue::Guid(bytes) => Some(format_guid(bytes)),
            TagValue::Empty | TagValue::Null | TagValue::List | TagValue::Binary(_) => None,
        })
    }

    /// Splits the value into its text and binary forms.
    pub fn into_formatted(self) -> Result<FormattedValue> {
        let text = self.text()?;
        let binary = match self {
            TagValue::Binary(bytes) => bytes,
            _ => None,
        };
        Ok(FormattedValue { text, binary })
    }
}

/// Text and binary forms of a tag value. At most one is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FormattedValue {
    /// Canonical text for scalars, timestamps, strings and GUIDs.
    pub text: Option<String>,
    /// Raw bytes for binary tags.
    pub binary: Option<Vec<u8>>,
}

/// Formats the value of a tag.
pub fn format_value(tag: &Tag<'_>) -> Result<FormattedValue> {
    TagValue::read(tag)?.into_formatted()
}

/// Converts a FILETIME to a UTC date-time.
///
/// Returns `None` outside `0..=MAX_FILETIME`.
pub fn filetime_to_datetime(filetime: i64) -> Option<DateTime<Utc>> {
    if !(0..=MAX_FILETIME).contains(&filetime) {
        return None;
    }
    // Windows FILETIME is 100-nanosecond intervals since 1601-01-01
    let seconds = filetime / TICKS_PER_SECOND - FILETIME_UNIX_DIFF;
    let nanos = ((filetime % TICKS_PER_SECOND) * 100) as u32;
    DateTime::from_timestamp(seconds, nanos)
}

/// Formats a FILETIME as ISO-8601 UTC with seven fractional digits.
///
/// # Errors
///
/// Returns a format error for negative FILETIMEs or ones past year 9999.
pub fn format_filetime(filetime: i64) -> Result<String> {
    let datetime = filetime_to_datetime(filetime).ok_or_else(|| {
        SdbError::format_error(format!("FILETIME {} is out of range", filetime))
    })?;
    Ok(format!(
        "{}.{:07}Z",
        datetime.format("%Y-%m-%dT%H:%M:%S"),
        filetime % TICKS_PER_SECOND
    ))
}

/// Parses an ISO-8601 date-time back into a FILETIME.
pub fn parse_filetime(text: &str) -> Option<i64> {
    let datetime = DateTime::parse_from_rfc3339(text).ok()?.with_timezone(&Utc);
    let seconds = datetime.timestamp().checked_add(FILETIME_UNIX_DIFF)?;
    let ticks = i64::from(datetime.timestamp_subsec_nanos() / 100);
    seconds.checked_mul(TICKS_PER_SECOND)?.checked_add(ticks)
}

/// Formats GUID bytes in braced form using the mixed-endian GUID layout.
///
/// ```
/// let bytes = [
///     0x33, 0x22, 0x11, 0x00, 0x55, 0x44, 0x77, 0x66,
///     0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff,
/// ];
/// assert_eq!(
///     sdb_xml::value::format_guid(&bytes),
///     "{00112233-4455-6677-8899-aabbccddeeff}"
/// );
/// ```
pub fn format_guid(bytes: &[u8; 16]) -> String {
    Uuid::from_bytes_le(*bytes).braced().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_scalar_text_is_plain_decimal() {
        assert_eq!(TagValue::Dword(1_234_567).text().unwrap().as_deref(), Some("1234567"));
        assert_eq!(TagValue::Word(-2).text().unwrap().as_deref(), Some("-2"));
        assert_eq!(TagValue::Byte(255).text().unwrap().as_deref(), Some("255"));
        assert_eq!(
            TagValue::Qword(i64::MIN).text().unwrap().as_deref(),
            Some("-9223372036854775808")
        );
    }

    #[test]
    fn test_valueless_kinds() {
        assert_eq!(TagValue::Empty.text().unwrap(), None);
        assert_eq!(TagValue::Null.text().unwrap(), None);
        assert_eq!(TagValue::List.text().unwrap(), None);
        let formatted = TagValue::Binary(Some(vec![1, 2])).into_formatted().unwrap();
        assert_eq!(formatted.text, None);
        assert_eq!(formatted.binary, Some(vec![1, 2]));
    }

    #[test]
    fn test_filetime_epoch() {
        assert_eq!(format_filetime(0).unwrap(), "1601-01-01T00:00:00.0000000Z");
        assert_eq!(
            format_filetime(FILETIME_UNIX_DIFF * TICKS_PER_SECOND + 1).unwrap(),
            "1970-01-01T00:00:00.0000001Z"
        );
    }

    #[test]
    fn test_filetime_max() {
        assert_eq!(format_filetime(MAX_FILETIME).unwrap(), "9999-12-31T23:59:59.9999999Z");
        assert!(format_filetime(MAX_FILETIME + 1).is_err());
        assert!(format_filetime(-1).is_err());
    }

    #[test]
    fn test_guid_layout() {
        let mut bytes = [0u8; 16];
        bytes[0] = 0x01;
        bytes[4] = 0x02;
        bytes[6] = 0x03;
        bytes[8] = 0x04;
        bytes[15] = 0x05;
        assert_eq!(format_guid(&bytes), "{00000001-0002-0003-0400-000000000005}");
    }

    proptest! {
        #[test]
        fn prop_filetime_round_trip(filetime in 0..=MAX_FILETIME) {
            let text = format_filetime(filetime).unwrap();
            prop_assert_eq!(parse_filetime(&text), Some(filetime));
        }

        #[test]
        fn prop_guid_is_injective(a in any::<[u8; 16]>(), b in any::<[u8; 16]>()) {
            prop_assert_eq!(a == b, format_guid(&a) == format_guid(&b));
        }

        #[test]
        fn prop_guid_is_canonical(bytes in any::<[u8; 16]>()) {
            let text = format_guid(&bytes);
            prop_assert_eq!(text.len(), 38);
            let parsed = Uuid::parse_str(&text).unwrap();
            prop_assert_eq!(parsed.to_bytes_le(), bytes);
        }
    }
}
