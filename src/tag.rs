//! Read-only views over tags of an open database.

use crate::error::{SdbError, Result};
use crate::provider::{Provider, TagId, TAGID_ROOT};
use crate::tag_type::{classify, BaseType, SemanticKind, TagCode};
use std::rc::Rc;

/// A view over one tag.
///
/// Views are cheap and transient: the provider owns the tree, and `code`,
/// `name` and `size` are asked of it on every call. A view keeps its parent
/// chain alive, so children may outlive the view they came from.
#[derive(Clone)]
pub struct Tag<'a> {
    provider: &'a dyn Provider,
    id: TagId,
    parent: Option<Rc<Tag<'a>>>,
}

impl<'a> Tag<'a> {
    /// Returns the root tag of a provider.
    pub fn root(provider: &'a dyn Provider) -> Self {
        Self {
            provider,
            id: TAGID_ROOT,
            parent: None,
        }
    }

    /// Tag id within the open database.
    pub fn id(&self) -> TagId {
        self.id
    }

    /// Returns true for the root tag.
    pub fn is_root(&self) -> bool {
        self.id == TAGID_ROOT
    }

    /// The parent view, `None` only for the root.
    pub fn parent(&self) -> Option<&Tag<'a>> {
        self.parent.as_deref()
    }

    /// Type code of this tag.
    pub fn code(&self) -> TagCode {
        self.provider.tag_code(self.id)
    }

    /// Base type of this tag.
    pub fn base_type(&self) -> BaseType {
        BaseType::of(self.code())
    }

    /// Semantic kind of this tag.
    pub fn kind(&self) -> SemanticKind {
        classify(self.code())
    }

    /// Name of this tag's type code.
    pub fn name(&self) -> String {
        self.provider.tag_name(self.code())
    }

    /// Byte length of this tag's data.
    pub fn size(&self) -> u32 {
        self.provider.data_size(self.id)
    }

    /// Returns a cursor positioned before the first child.
    pub fn cursor(&self) -> ChildCursor {
        ChildCursor::new(self.id)
    }

    /// Returns the children of this tag in storage order.
    ///
    /// Every call starts a fresh walk from the first child.
    pub fn children(&self) -> Children<'a> {
        Children {
            parent: Rc::new(self.clone()),
            cursor: Some(self.cursor()),
        }
    }

    /// Returns true if this tag has at least one child.
    pub fn has_children(&self) -> bool {
        self.provider.first_child(self.id).is_some()
    }

    /// Finds the first immediate child with the given type code.
    pub fn find(&self, code: TagCode) -> Option<Tag<'a>> {
        let id = self.provider.find_first_tag(self.id, code)?;
        Some(Self::child_of(&Rc::new(self.clone()), id))
    }

    fn child_of(parent: &Rc<Self>, id: TagId) -> Tag<'a> {
        Tag {
            provider: parent.provider,
            id,
            parent: Some(Rc::clone(parent)),
        }
    }

    /// Reads a BYTE value, or `default` if absent.
    pub fn read_byte(&self, default: u8) -> Result<u8> {
        self.provider.read_byte(self.id, default)
    }

    /// Reads a WORD value, or `default` if absent.
    pub fn read_word(&self, default: i16) -> Result<i16> {
        self.provider.read_word(self.id, default)
    }

    /// Reads a DWORD value, or `default` if absent.
    pub fn read_dword(&self, default: i32) -> Result<i32> {
        self.provider.read_dword(self.id, default)
    }

    /// Reads a QWORD value, or `default` if absent.
    pub fn read_qword(&self, default: i64) -> Result<i64> {
        self.provider.read_qword(self.id, default)
    }

    /// Reads the binary data into a buffer sized to [`Tag::size`].
    ///
    /// # Errors
    ///
    /// Returns [`SdbError::BinaryRead`] if the provider cannot fill it.
    pub fn read_binary(&self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; self.size() as usize];
        if self.provider.read_binary(self.id, &mut buf) {
            Ok(buf)
        } else {
            Err(SdbError::BinaryRead { id: self.id })
        }
    }

    /// Reads exactly `N` bytes of binary data.
    pub fn read_binary_array<const N: usize>(&self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        if self.provider.read_binary(self.id, &mut buf) {
            Ok(buf)
        } else {
            Err(SdbError::BinaryRead { id: self.id })
        }
    }

    /// Reads the string value of a STRING or STRINGREF tag.
    ///
    /// # Errors
    ///
    /// Returns [`SdbError::StringRead`] if the provider has no string for it.
    pub fn read_string(&self) -> Result<String> {
        self.provider
            .read_string(self.id)
            .ok_or(SdbError::StringRead { id: self.id })
    }
}

impl std::fmt::Debug for Tag<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tag")
            .field("id", &self.id)
            .field("parent", &self.parent().map(Tag::id))
            .finish()
    }
}

/// Position in a walk over the children of one tag.
///
/// The cursor is a plain value; advancing it never mutates shared state, so
/// any number of walks over the same parent are independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildCursor {
    /// Tag whose children are walked.
    pub parent: TagId,
    /// Last child returned, `None` before the first.
    pub last: Option<TagId>,
}

impl ChildCursor {
    /// Cursor positioned before the first child of `parent`.
    pub fn new(parent: TagId) -> Self {
        Self { parent, last: None }
    }

    /// Returns the next child and the cursor after it, or `None` when done.
    pub fn advance(self, provider: &dyn Provider) -> Option<(TagId, ChildCursor)> {
        let next = match self.last {
            None => provider.first_child(self.parent),
            Some(prev) => provider.next_child(self.parent, prev),
        }?;
        Some((
            next,
            ChildCursor {
                parent: self.parent,
                last: Some(next),
            },
        ))
    }
}

/// Iterator over the children of a tag.
pub struct Children<'a> {
    parent: Rc<Tag<'a>>,
    cursor: Option<ChildCursor>,
}

impl<'a> Iterator for Children<'a> {
    type Item = Tag<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (id, cursor) = self.cursor.take()?.advance(self.parent.provider)?;
        self.cursor = Some(cursor);
        Some(Tag::child_of(&self.parent, id))
    }
}

impl std::iter::FusedIterator for Children<'_> {}
