//! XML report generation.
//!
//! The report is a depth-first, pre-order rendering of the tag tree:
//!
//! ```text
//! <?xml version="1.0" encoding="utf-8" standalone="yes"?>
//! <SDB xmlns:xs="http://www.w3.org/2001/XMLSchema" path="...">
//!   <DATABASE>
//!     <TIME type="xs:dateTime" baseType="xs:long">2020-01-01T00:00:00.0000000Z</TIME>
//!     <NAME type="xs:string">Example</NAME>
//!     ...
//!   </DATABASE>
//! </SDB>
//! ```

use crate::config::{OutputMode, ReportOptions};
use crate::database::ShimDatabase;
use crate::error::{SdbError, Result};
use crate::extract::Extractor;
use crate::provider::Provider;
use crate::tag::Tag;
use crate::tag_type::SemanticKind;
use crate::value::format_value;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;
use tracing::{info, instrument, trace};

/// Namespace bound to the `xs` prefix.
pub const XML_SCHEMA_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// Name of the document element.
pub const ROOT_ELEMENT: &str = "SDB";

/// XML Schema type attributes for a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmlTypes {
    /// Value of the `type` attribute.
    pub type_name: &'static str,
    /// Value of the `baseType` attribute, when the presented type differs
    /// from the stored one.
    pub base_type: Option<&'static str>,
}

impl XmlTypes {
    const fn plain(type_name: &'static str) -> Self {
        Self {
            type_name,
            base_type: None,
        }
    }
}

/// Maps a semantic kind to its XML Schema types.
///
/// Returns `None` for kinds that carry no type attribute. In extraction mode
/// binary tags are URIs and `baseType` is never written.
pub fn xml_types(kind: SemanticKind, extract: bool) -> Option<XmlTypes> {
    let types = match kind {
        SemanticKind::Byte => XmlTypes::plain("xs:byte"),
        SemanticKind::Word => XmlTypes::plain("xs:short"),
        SemanticKind::Dword => XmlTypes::plain("xs:int"),
        SemanticKind::Qword => XmlTypes::plain("xs:long"),
        SemanticKind::Timestamp => XmlTypes {
            type_name: "xs:dateTime",
            base_type: Some("xs:long"),
        },
        SemanticKind::String | SemanticKind::StringRef => XmlTypes::plain("xs:string"),
        SemanticKind::Guid => XmlTypes {
            type_name: "xs:string",
            base_type: Some("xs:base64Binary"),
        },
        SemanticKind::Binary | SemanticKind::FileReference if extract => {
            XmlTypes::plain("xs:anyURI")
        }
        SemanticKind::Binary | SemanticKind::FileReference => XmlTypes::plain("xs:base64Binary"),
        SemanticKind::Empty | SemanticKind::Null | SemanticKind::List => return None,
    };

    Some(if extract {
        XmlTypes::plain(types.type_name)
    } else {
        types
    })
}

/// Encodes a name as a valid XML local name.
///
/// Characters not allowed at their position, and `:`, become `_xHHHH_`
/// (`_xHHHHHHHH_` outside the BMP). An underscore that would otherwise read
/// as the start of such an escape is itself escaped, so [`decode_name`]
/// restores the original.
pub fn encode_local_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    for (i, (pos, c)) in name.char_indices().enumerate() {
        let allowed = if i == 0 {
            is_name_start_char(c)
        } else {
            is_name_char(c)
        };
        let escape = !allowed || (c == '_' && starts_with_escape(&name[pos..]));
        if escape {
            push_escape(&mut result, c);
        } else {
            result.push(c);
        }
    }
    result
}

/// Reverses [`encode_local_name`].
pub fn decode_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut rest = name;
    while !rest.is_empty() {
        if let Some((c, len)) = parse_escape(rest) {
            result.push(c);
            rest = &rest[len..];
        } else {
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                result.push(c);
            }
            rest = chars.as_str();
        }
    }
    result
}

fn push_escape(out: &mut String, c: char) {
    let code = u32::from(c);
    if code > 0xFFFF {
        out.push_str(&format!("_x{:08X}_", code));
    } else {
        out.push_str(&format!("_x{:04X}_", code));
    }
}

/// Length of the hex digits of an escape at the start of `s`, if any.
fn escape_digits(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    if bytes.len() < 2 || bytes[0] != b'_' || !matches!(bytes[1], b'x' | b'X') {
        return None;
    }
    [8, 4].into_iter().find(|&n| {
        bytes.len() > n + 2
            && bytes[2..n + 2].iter().all(u8::is_ascii_hexdigit)
            && bytes[n + 2] == b'_'
    })
}

fn starts_with_escape(s: &str) -> bool {
    escape_digits(s).is_some()
}

fn parse_escape(s: &str) -> Option<(char, usize)> {
    let digits = escape_digits(s)?;
    let code = u32::from_str_radix(&s[2..digits + 2], 16).ok()?;
    Some((char::from_u32(code)?, digits + 3))
}

fn is_name_start_char(c: char) -> bool {
    matches!(c,
        'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}'
            | '\u{300}'..='\u{36F}'
            | '\u{203F}'..='\u{2040}')
}

/// Returns true if `c` may appear in XML 1.0 character data.
pub fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

fn check_xml_text(text: &str) -> Result<()> {
    match text.chars().find(|c| !is_xml_char(*c)) {
        Some(c) => Err(SdbError::format_error(format!(
            "character U+{:04X} cannot be written to XML",
            u32::from(c)
        ))),
        None => Ok(()),
    }
}

fn xml_error(err: impl std::fmt::Display) -> SdbError {
    SdbError::Xml(err.to_string())
}

/// Streams a database as an XML report.
pub struct ReportWriter<W: Write> {
    writer: Writer<W>,
    mode: OutputMode,
    extractor: Option<Extractor>,
}

impl<W: Write> ReportWriter<W> {
    /// Creates a report writer over `inner`.
    pub fn new(inner: W, options: &ReportOptions) -> Self {
        let writer = if options.indent > 0 {
            Writer::new_with_indent(inner, b' ', options.indent)
        } else {
            Writer::new(inner)
        };
        let extractor = match &options.mode {
            OutputMode::Extract { dir } => Some(Extractor::new(dir.clone())),
            _ => None,
        };
        Self {
            writer,
            mode: options.mode.clone(),
            extractor,
        }
    }

    /// Writes the whole database and returns the underlying writer.
    ///
    /// # Errors
    ///
    /// Any failure aborts the report; what has been written so far is not a
    /// complete document.
    #[instrument(skip_all, fields(path = %database.path().display()))]
    pub fn write_database<P: Provider>(mut self, database: &ShimDatabase<P>) -> Result<W> {
        info!("Writing XML report");
        self.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), Some("yes"))))?;

        let path = database.path().display().to_string();
        check_xml_text(&path)?;
        let mut root = BytesStart::new(ROOT_ELEMENT);
        root.push_attribute(("xmlns:xs", XML_SCHEMA_NS));
        root.push_attribute(("path", path.as_str()));

        let root_tag = database.root();
        if root_tag.has_children() {
            self.write_event(Event::Start(root))?;
            for tag in root_tag.children() {
                self.write_tag(&tag)?;
            }
            self.write_event(Event::End(BytesEnd::new(ROOT_ELEMENT)))?;
        } else {
            self.write_event(Event::Empty(root))?;
        }

        let mut inner = self.writer.into_inner();
        inner.write_all(b"\n")?;
        inner.flush()?;
        Ok(inner)
    }

    fn write_tag(&mut self, tag: &Tag<'_>) -> Result<()> {
        let name = encode_local_name(&tag.name());
        if name.is_empty() {
            return Err(SdbError::format_error(format!(
                "tag {:#x} has an empty name",
                tag.id()
            )));
        }
        let kind = tag.kind();
        trace!(id = tag.id(), name = %name, ?kind, "Writing tag");

        let mut start = BytesStart::new(name.as_str());
        if let Some(types) = xml_types(kind, self.mode.is_extract()) {
            start.push_attribute(("type", types.type_name));
            if let Some(base_type) = types.base_type {
                start.push_attribute(("baseType", base_type));
            }
        }

        let text = self.value_text(tag, kind)?;
        if let Some(text) = &text {
            check_xml_text(text)?;
        }

        if text.is_none() && !tag.has_children() {
            return self.write_event(Event::Empty(start));
        }

        self.write_event(Event::Start(start))?;
        if let Some(text) = &text {
            self.write_event(Event::Text(BytesText::from_escaped(partial_escape(text))))?;
        }
        for child in tag.children() {
            self.write_tag(&child)?;
        }
        self.write_event(Event::End(BytesEnd::new(name.as_str())))
    }

    /// Text content of a tag element, writing a side file in extraction mode.
    fn value_text(&mut self, tag: &Tag<'_>, kind: SemanticKind) -> Result<Option<String>> {
        if !kind.is_binary() {
            return Ok(format_value(tag)?.text);
        }

        // Payloads are only read when the report uses them
        match (&self.mode, self.extractor.as_mut()) {
            (OutputMode::Base64, _) => Ok(Some(STANDARD.encode(tag.read_binary()?))),
            (OutputMode::Extract { .. }, Some(extractor)) => {
                let data = tag.read_binary()?;
                let file_name = extractor.extract(tag, &data)?;
                Ok(Some(format!("file://{}", file_name)))
            }
            _ => Ok(None),
        }
    }

    fn write_event(&mut self, event: Event<'_>) -> Result<()> {
        self.writer.write_event(event).map_err(xml_error)
    }
}

/// Writes `database` as an XML report to `out`.
pub fn write_report<W: Write, P: Provider>(
    database: &ShimDatabase<P>,
    out: W,
    options: &ReportOptions,
) -> Result<W> {
    ReportWriter::new(out, options).write_database(database)
}
