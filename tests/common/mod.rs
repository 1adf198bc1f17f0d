//! Shared fixtures: an in-memory provider and an `.sdb` image builder.

#![allow(dead_code)]

use sdb_xml::error::{Result, SdbError};
use sdb_xml::sdb::SDB_MAGIC;
use sdb_xml::tag_type::{base, tag_name, tags, BaseType, TagCode, TAG_TYPE_MASK};
use sdb_xml::{Provider, TagId};
use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

/// Value stored on an in-memory tag.
#[derive(Debug, Clone)]
pub enum MemValue {
    None,
    Byte(u8),
    Word(i16),
    Dword(i32),
    Qword(i64),
    String(String),
    Bytes(Vec<u8>),
    /// Reads of this value fail.
    Unreadable,
}

struct Node {
    code: TagCode,
    children: Vec<TagId>,
    value: MemValue,
}

/// A provider over a tree built in memory.
pub struct MemoryProvider {
    nodes: Vec<Node>,
    names: HashMap<TagCode, String>,
    closes: Rc<Cell<usize>>,
    binary_reads: Rc<Cell<usize>>,
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                code: 0,
                children: Vec::new(),
                value: MemValue::None,
            }],
            names: HashMap::new(),
            closes: Rc::new(Cell::new(0)),
            binary_reads: Rc::new(Cell::new(0)),
        }
    }

    /// Overrides the name reported for a type code.
    pub fn with_name(mut self, code: TagCode, name: &str) -> Self {
        self.names.insert(code, name.to_string());
        self
    }

    /// Adds a tag under `parent` and returns its id.
    pub fn add(&mut self, parent: TagId, code: TagCode, value: MemValue) -> TagId {
        let id = self.nodes.len() as TagId;
        self.nodes.push(Node {
            code,
            children: Vec::new(),
            value,
        });
        self.nodes[parent as usize].children.push(id);
        id
    }

    /// Counter of `close` calls.
    pub fn close_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.closes)
    }

    /// Counter of `read_binary` calls.
    pub fn binary_read_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.binary_reads)
    }

    fn node(&self, id: TagId) -> Option<&Node> {
        self.nodes.get(id as usize)
    }

    fn scalar(&self, id: TagId, expected: u16) -> Result<Option<&MemValue>> {
        let Some(node) = self.node(id) else {
            return Ok(None);
        };
        if node.code as u16 & TAG_TYPE_MASK != expected {
            return Err(SdbError::TypeMismatch {
                id,
                expected,
                found: node.code as u16,
            });
        }
        Ok(Some(&node.value))
    }
}

fn mismatch(id: TagId, expected: u16, code: TagCode) -> SdbError {
    SdbError::TypeMismatch {
        id,
        expected,
        found: code as u16,
    }
}

impl Provider for MemoryProvider {
    fn first_child(&self, parent: TagId) -> Option<TagId> {
        self.node(parent)?.children.first().copied()
    }

    fn next_child(&self, parent: TagId, prev: TagId) -> Option<TagId> {
        let children = &self.node(parent)?.children;
        let pos = children.iter().position(|&c| c == prev)?;
        children.get(pos + 1).copied()
    }

    fn find_first_tag(&self, parent: TagId, code: TagCode) -> Option<TagId> {
        self.node(parent)?
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c as usize].code == code)
    }

    fn tag_name(&self, code: TagCode) -> String {
        self.names
            .get(&code)
            .cloned()
            .unwrap_or_else(|| tag_name(code).to_string())
    }

    fn tag_code(&self, id: TagId) -> TagCode {
        self.node(id).map(|n| n.code).unwrap_or(0)
    }

    fn read_byte(&self, id: TagId, default: u8) -> Result<u8> {
        match self.scalar(id, base::BYTE)? {
            Some(MemValue::Byte(v)) => Ok(*v),
            Some(MemValue::None) | None => Ok(default),
            Some(_) => Err(mismatch(id, base::BYTE, self.tag_code(id))),
        }
    }

    fn read_word(&self, id: TagId, default: i16) -> Result<i16> {
        match self.scalar(id, base::WORD)? {
            Some(MemValue::Word(v)) => Ok(*v),
            Some(MemValue::None) | None => Ok(default),
            Some(_) => Err(mismatch(id, base::WORD, self.tag_code(id))),
        }
    }

    fn read_dword(&self, id: TagId, default: i32) -> Result<i32> {
        match self.scalar(id, base::DWORD)? {
            Some(MemValue::Dword(v)) => Ok(*v),
            Some(MemValue::None) | None => Ok(default),
            Some(_) => Err(mismatch(id, base::DWORD, self.tag_code(id))),
        }
    }

    fn read_qword(&self, id: TagId, default: i64) -> Result<i64> {
        match self.scalar(id, base::QWORD)? {
            Some(MemValue::Qword(v)) => Ok(*v),
            Some(MemValue::None) | None => Ok(default),
            Some(_) => Err(mismatch(id, base::QWORD, self.tag_code(id))),
        }
    }

    fn read_binary(&self, id: TagId, buf: &mut [u8]) -> bool {
        self.binary_reads.set(self.binary_reads.get() + 1);
        match self.node(id).map(|n| &n.value) {
            Some(MemValue::Bytes(bytes)) if bytes.len() <= buf.len() => {
                buf[..bytes.len()].copy_from_slice(bytes);
                true
            }
            _ => false,
        }
    }

    fn data_size(&self, id: TagId) -> u32 {
        let Some(node) = self.node(id) else {
            return 0;
        };
        match &node.value {
            MemValue::Bytes(bytes) => bytes.len() as u32,
            MemValue::String(s) => (s.encode_utf16().count() as u32 + 1) * 2,
            _ => BaseType::of(node.code).fixed_size().unwrap_or(0),
        }
    }

    fn read_string(&self, id: TagId) -> Option<String> {
        match &self.node(id)?.value {
            MemValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    fn close(&mut self) {
        self.closes.set(self.closes.get() + 1);
    }
}

/// Builds `.sdb` images tag by tag.
pub struct SdbImage {
    buf: Vec<u8>,
    open_lists: Vec<usize>,
    string_refs: Vec<(usize, String)>,
}

impl Default for SdbImage {
    fn default() -> Self {
        Self::new()
    }
}

impl SdbImage {
    pub fn new() -> Self {
        let mut buf = Vec::new();
        buf.extend_from_slice(&3u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(SDB_MAGIC);
        Self {
            buf,
            open_lists: Vec::new(),
            string_refs: Vec::new(),
        }
    }

    /// Offset the next tag will be written at.
    pub fn offset(&self) -> TagId {
        self.buf.len() as TagId
    }

    fn code(&mut self, code: TagCode) {
        self.buf.extend_from_slice(&(code as u16).to_le_bytes());
    }

    pub fn null(&mut self, code: TagCode) -> &mut Self {
        self.code(code);
        self
    }

    pub fn byte(&mut self, code: TagCode, value: u8) -> &mut Self {
        self.code(code);
        self.buf.push(value);
        self
    }

    pub fn word(&mut self, code: TagCode, value: i16) -> &mut Self {
        self.code(code);
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn dword(&mut self, code: TagCode, value: i32) -> &mut Self {
        self.code(code);
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn qword(&mut self, code: TagCode, value: i64) -> &mut Self {
        self.code(code);
        self.buf.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn string(&mut self, code: TagCode, value: &str) -> &mut Self {
        self.code(code);
        let data = utf16z(value);
        self.buf.extend_from_slice(&(data.len() as u32).to_le_bytes());
        self.buf.extend_from_slice(&data);
        self
    }

    /// A STRINGREF resolved against the string table written by `build`.
    pub fn string_ref(&mut self, code: TagCode, value: &str) -> &mut Self {
        self.code(code);
        self.string_refs.push((self.buf.len(), value.to_string()));
        self.buf.extend_from_slice(&0u32.to_le_bytes());
        self
    }

    pub fn binary(&mut self, code: TagCode, data: &[u8]) -> &mut Self {
        self.code(code);
        self.buf.extend_from_slice(&(data.len() as u32).to_le_bytes());
        self.buf.extend_from_slice(data);
        self
    }

    pub fn begin_list(&mut self, code: TagCode) -> &mut Self {
        self.code(code);
        self.open_lists.push(self.buf.len());
        self.buf.extend_from_slice(&0u32.to_le_bytes());
        self
    }

    pub fn end_list(&mut self) -> &mut Self {
        let size_pos = self.open_lists.pop().expect("no open list");
        let size = (self.buf.len() - size_pos - 4) as u32;
        self.buf[size_pos..size_pos + 4].copy_from_slice(&size.to_le_bytes());
        self
    }

    /// Finishes the image, appending a string table if any refs were written.
    pub fn build(&self) -> Vec<u8> {
        assert!(self.open_lists.is_empty(), "unterminated list");
        let mut image = SdbImage {
            buf: self.buf.clone(),
            open_lists: Vec::new(),
            string_refs: Vec::new(),
        };
        if self.string_refs.is_empty() {
            return image.buf;
        }

        let table = image.buf.len();
        image.begin_list(tags::STRINGTABLE);
        let mut items: HashMap<&str, usize> = HashMap::new();
        for (_, value) in &self.string_refs {
            if !items.contains_key(value.as_str()) {
                items.insert(value.as_str(), image.buf.len() - table);
                image.string(0x8801u16 as TagCode, value);
            }
        }
        image.end_list();

        let mut buf = image.buf;
        for (pos, value) in &self.string_refs {
            let offset = items[value.as_str()] as u32;
            buf[*pos..*pos + 4].copy_from_slice(&offset.to_le_bytes());
        }
        buf
    }
}

fn utf16z(value: &str) -> Vec<u8> {
    value
        .encode_utf16()
        .chain(std::iter::once(0))
        .flat_map(u16::to_le_bytes)
        .collect()
}

/// Report text for `bytes`.
pub fn text(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).expect("report is UTF-8")
}
