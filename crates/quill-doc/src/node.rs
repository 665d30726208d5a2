//! Blocks, text runs and inline entities.
//!
//! ## Learning: Sum Types Instead of Class Hierarchies
//!
//! A document leaf is *either* a text run *or* an inline entity, and an
//! entity is *either* a record, a page or a dice roller. Rust enums express
//! this directly, and `match` forces every consumer to handle every case:
//! adding a new entity kind is a compile error everywhere it matters.

use serde::{Deserialize, Serialize};

/// Block-level formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlockKind {
    /// Default block (`null` in the exchanged value)
    #[default]
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
    ListItem,
    Quote,
    Callout,
}

impl BlockKind {
    /// Returns the heading kind for a level between 1 and 3.
    pub fn heading(level: usize) -> Option<Self> {
        match level {
            1 => Some(BlockKind::Heading1),
            2 => Some(BlockKind::Heading2),
            3 => Some(BlockKind::Heading3),
            _ => None,
        }
    }

    /// Returns the name used in the exchanged value.
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Paragraph => "paragraph",
            BlockKind::Heading1 => "h1",
            BlockKind::Heading2 => "h2",
            BlockKind::Heading3 => "h3",
            BlockKind::ListItem => "list-item",
            BlockKind::Quote => "quote",
            BlockKind::Callout => "callout",
        }
    }
}

/// The container a list item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListKind {
    Ordered,
    Unordered,
}

impl ListKind {
    /// Returns the container name used in the exchanged value.
    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::Ordered => "ordered-list",
            ListKind::Unordered => "unordered-list",
        }
    }
}

/// A character-level format flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mark {
    Bold,
    Italic,
}

/// The set of format flags carried by a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Marks {
    pub bold: bool,
    pub italic: bool,
}

impl Marks {
    /// Plain text, no flags set.
    pub const NONE: Marks = Marks {
        bold: false,
        italic: false,
    };

    /// Returns whether a flag is set.
    pub fn has(&self, mark: Mark) -> bool {
        match mark {
            Mark::Bold => self.bold,
            Mark::Italic => self.italic,
        }
    }

    /// Sets or clears a flag.
    pub fn set(&mut self, mark: Mark, value: bool) {
        match mark {
            Mark::Bold => self.bold = value,
            Mark::Italic => self.italic = value,
        }
    }

    /// Returns a copy with one flag changed.
    pub fn with(mut self, mark: Mark, value: bool) -> Self {
        self.set(mark, value);
        self
    }
}

/// A run of characters sharing the same marks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextRun {
    pub text: String,
    pub marks: Marks,
}

impl TextRun {
    /// Creates an unformatted run.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Marks::NONE,
        }
    }

    /// Creates a run with the given marks.
    pub fn with_marks(text: impl Into<String>, marks: Marks) -> Self {
        Self {
            text: text.into(),
            marks,
        }
    }

    /// Length in characters.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    /// Returns true if the run holds no characters.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Splits the run at a character index, returning the tail.
    pub(crate) fn split_off(&mut self, char_idx: usize) -> TextRun {
        let byte = byte_index(&self.text, char_idx);
        TextRun {
            text: self.text.split_off(byte),
            marks: self.marks,
        }
    }
}

/// Converts a character index into a byte index, clamping at the end.
pub(crate) fn byte_index(text: &str, char_idx: usize) -> usize {
    text.char_indices()
        .nth(char_idx)
        .map(|(byte, _)| byte)
        .unwrap_or(text.len())
}

/// Identifier of a record in the host's record dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key of a page in the host's page dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageKey(String);

impl PageKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PageKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for PageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Copy of a record's identity taken at insertion time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    #[serde(rename = "__id")]
    pub id: RecordId,
    #[serde(default)]
    pub name: String,
}

/// Copy of a page's identity taken at insertion time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    pub key: PageKey,
    #[serde(default)]
    pub name: String,
}

/// A dice expression such as `2d6+3`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceRoll {
    pub expression: String,
}

impl DiceRoll {
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
        }
    }
}

/// An atomic inline node.
///
/// Entities hold no editable content: they are selected, deleted and
/// skipped over as a single unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineEntity {
    Record(RecordRef),
    Page(PageRef),
    Dice(DiceRoll),
}

impl InlineEntity {
    /// Returns the entity's kind.
    pub fn kind(&self) -> InlineKind {
        match self {
            InlineEntity::Record(_) => InlineKind::Record,
            InlineEntity::Page(_) => InlineKind::Page,
            InlineEntity::Dice(_) => InlineKind::Dice,
        }
    }

    /// Text shown for the entity.
    pub fn label(&self) -> &str {
        match self {
            InlineEntity::Record(record) => &record.name,
            InlineEntity::Page(page) => &page.name,
            InlineEntity::Dice(dice) => &dice.expression,
        }
    }
}

/// Discriminant of [`InlineEntity`], used to look up editing traits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InlineKind {
    Record = 0,
    Page = 1,
    Dice = 2,
}

/// How the kernel treats an inline kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InlineTraits {
    /// Cannot be split or entered; deleted as a whole
    pub atomic: bool,
    /// Has no editable children; occupies exactly one unit
    pub void: bool,
}

/// Editing traits of every inline kind, indexed by discriminant.
pub const INLINE_TRAITS: [(InlineKind, InlineTraits); 3] = [
    (
        InlineKind::Record,
        InlineTraits {
            atomic: true,
            void: true,
        },
    ),
    (
        InlineKind::Page,
        InlineTraits {
            atomic: true,
            void: true,
        },
    ),
    (
        InlineKind::Dice,
        InlineTraits {
            atomic: true,
            void: true,
        },
    ),
];

impl InlineKind {
    /// Looks up the kind in [`INLINE_TRAITS`].
    pub fn traits(self) -> InlineTraits {
        INLINE_TRAITS[self as usize].1
    }

    /// Returns the name used in the exchanged value.
    pub fn as_str(&self) -> &'static str {
        match self {
            InlineKind::Record => "record",
            InlineKind::Page => "page",
            InlineKind::Dice => "roller",
        }
    }
}

/// A child of a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(TextRun),
    Entity(InlineEntity),
}

impl Inline {
    /// Number of units the node occupies.
    pub fn unit_len(&self) -> usize {
        match self {
            Inline::Text(run) => run.len(),
            Inline::Entity(entity) => {
                if entity.kind().traits().void {
                    1
                } else {
                    entity.label().chars().count()
                }
            }
        }
    }

    /// Returns true for atomic entities.
    pub fn is_atomic(&self) -> bool {
        match self {
            Inline::Text(_) => false,
            Inline::Entity(entity) => entity.kind().traits().atomic,
        }
    }
}

impl From<TextRun> for Inline {
    fn from(run: TextRun) -> Self {
        Inline::Text(run)
    }
}

impl From<InlineEntity> for Inline {
    fn from(entity: InlineEntity) -> Self {
        Inline::Entity(entity)
    }
}

/// A block of inline content.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
    /// Block formatting
    pub kind: BlockKind,
    /// List container the block belongs to, if any
    pub list: Option<ListKind>,
    /// Inline children
    pub children: Vec<Inline>,
}

impl Block {
    /// Creates an empty block.
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            list: None,
            children: Vec::new(),
        }
    }

    /// Creates a default block holding plain text.
    pub fn paragraph(text: &str) -> Self {
        let mut block = Self::new(BlockKind::Paragraph);
        block.children.push(Inline::Text(TextRun::new(text)));
        block.normalize();
        block
    }

    /// Creates a list item inside a container of the given kind.
    pub fn list_item(list: ListKind, text: &str) -> Self {
        let mut block = Self::paragraph(text);
        block.kind = BlockKind::ListItem;
        block.list = Some(list);
        block
    }

    /// Appends an inline node, keeping the block normalized.
    pub fn push(mut self, inline: impl Into<Inline>) -> Self {
        self.children.push(inline.into());
        self.normalize();
        self
    }

    /// Length in units.
    pub fn len(&self) -> usize {
        self.children.iter().map(Inline::unit_len).sum()
    }

    /// Returns true if the block holds no units.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Concatenated text of the block's runs; entities contribute nothing.
    pub fn plain_text(&self) -> String {
        self.children
            .iter()
            .filter_map(|inline| match inline {
                Inline::Text(run) => Some(run.text.as_str()),
                Inline::Entity(_) => None,
            })
            .collect()
    }

    /// Returns true if the block is part of a list container.
    pub fn is_in_list(&self) -> bool {
        self.list.is_some()
    }

    /// Splits the children at a unit offset, returning the tail.
    ///
    /// Only text runs are ever cut; an entity always lands wholly on one
    /// side of the split.
    pub(crate) fn split_off(&mut self, offset: usize) -> Vec<Inline> {
        let mut remaining = offset;
        for idx in 0..self.children.len() {
            if remaining == 0 {
                return self.children.split_off(idx);
            }
            let len = self.children[idx].unit_len();
            if remaining < len {
                let mut tail = self.children.split_off(idx + 1);
                if let Inline::Text(run) = &mut self.children[idx] {
                    let rest = run.split_off(remaining);
                    tail.insert(0, Inline::Text(rest));
                }
                return tail;
            }
            remaining -= len;
        }
        Vec::new()
    }

    /// Returns a copy of the children between two unit offsets.
    pub(crate) fn slice(&self, start: usize, end: usize) -> Vec<Inline> {
        let mut copy = self.clone();
        let _ = copy.split_off(end);
        copy.split_off(start)
    }

    /// Merges adjacent runs with identical marks and drops empty runs.
    pub fn normalize(&mut self) {
        let mut merged: Vec<Inline> = Vec::with_capacity(self.children.len());
        for inline in self.children.drain(..) {
            match inline {
                Inline::Text(run) if run.is_empty() => {}
                Inline::Text(run) => match merged.last_mut() {
                    Some(Inline::Text(last)) if last.marks == run.marks => {
                        last.text.push_str(&run.text);
                    }
                    _ => merged.push(Inline::Text(run)),
                },
                entity => merged.push(entity),
            }
        }
        self.children = merged;
    }
}
