//! The exchanged document value.
//!
//! Hosts hand documents in and out as JSON: an array of block elements
//! `{ type, children }` whose leaves are text runs `{ text, bold?, italic? }`
//! or inline entities. List items are wrapped in a container element. A bare
//! string, `null` or an empty array are accepted and normalized.
//!
//! ## Learning: `#[serde(untagged)]`
//!
//! JSON nodes carry no explicit discriminant for "text vs element", so
//! [`ValueNode`] is untagged: serde tries each variant in order and keeps
//! the first that deserializes. Order matters: text runs (which require a
//! `text` field) come first, then entities (whose `type` must be one of the
//! entity names), then generic elements.

use serde::{Deserialize, Serialize};

use crate::node::{
    Block, BlockKind, DiceRoll, Inline, InlineEntity, ListKind, Marks, PageRef, RecordRef,
    TextRun,
};
use crate::{DocResult, Document};

/// A document as exchanged with the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Option<RawValue>", into = "Vec<ValueNode>")]
pub struct DocumentValue(pub Vec<ValueNode>);

/// Every shape the host may hand in.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Text(String),
    Nodes(Vec<ValueNode>),
}

impl From<Option<RawValue>> for DocumentValue {
    fn from(raw: Option<RawValue>) -> Self {
        match raw {
            Some(RawValue::Text(text)) => DocumentValue::from_text(&text),
            Some(RawValue::Nodes(nodes)) if !nodes.is_empty() => DocumentValue(nodes),
            _ => DocumentValue::empty(),
        }
    }
}

impl From<DocumentValue> for Vec<ValueNode> {
    fn from(value: DocumentValue) -> Self {
        value.0
    }
}

/// A node of the exchanged tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueNode {
    Text(ValueText),
    Entity(ValueEntity),
    Element(ValueElement),
}

/// A text leaf.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValueText {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bold: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub italic: Option<bool>,
}

impl ValueText {
    fn empty() -> Self {
        Self::default()
    }
}

fn void_children() -> Vec<ValueText> {
    vec![ValueText::empty()]
}

/// An inline entity leaf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ValueEntity {
    Record {
        record: RecordRef,
        #[serde(default = "void_children")]
        children: Vec<ValueText>,
    },
    Page {
        page: PageRef,
        #[serde(default = "void_children")]
        children: Vec<ValueText>,
    },
    #[serde(rename = "roller")]
    Roller {
        dice: String,
        #[serde(default = "void_children")]
        children: Vec<ValueText>,
    },
}

/// A block or list container element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueElement {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ElementKind>,
    #[serde(default)]
    pub children: Vec<ValueNode>,
}

/// Element type names.
///
/// Names this editor does not know deserialize as `Unknown` and are read
/// as default paragraphs, so one foreign block never rejects a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ElementKind {
    Paragraph,
    H1,
    H2,
    H3,
    ListItem,
    Quote,
    Callout,
    OrderedList,
    #[serde(alias = "list")]
    UnorderedList,
    #[serde(other)]
    Unknown,
}

impl ElementKind {
    fn container(&self) -> Option<ListKind> {
        match self {
            ElementKind::OrderedList => Some(ListKind::Ordered),
            ElementKind::UnorderedList => Some(ListKind::Unordered),
            _ => None,
        }
    }

    fn block_kind(&self) -> BlockKind {
        match self {
            ElementKind::H1 => BlockKind::Heading1,
            ElementKind::H2 => BlockKind::Heading2,
            ElementKind::H3 => BlockKind::Heading3,
            ElementKind::ListItem => BlockKind::ListItem,
            ElementKind::Quote => BlockKind::Quote,
            ElementKind::Callout => BlockKind::Callout,
            ElementKind::Paragraph
            | ElementKind::OrderedList
            | ElementKind::UnorderedList
            | ElementKind::Unknown => BlockKind::Paragraph,
        }
    }
}

impl From<BlockKind> for Option<ElementKind> {
    fn from(kind: BlockKind) -> Self {
        match kind {
            BlockKind::Paragraph => None,
            BlockKind::Heading1 => Some(ElementKind::H1),
            BlockKind::Heading2 => Some(ElementKind::H2),
            BlockKind::Heading3 => Some(ElementKind::H3),
            BlockKind::ListItem => Some(ElementKind::ListItem),
            BlockKind::Quote => Some(ElementKind::Quote),
            BlockKind::Callout => Some(ElementKind::Callout),
        }
    }
}

impl From<ListKind> for ElementKind {
    fn from(kind: ListKind) -> Self {
        match kind {
            ListKind::Ordered => ElementKind::OrderedList,
            ListKind::Unordered => ElementKind::UnorderedList,
        }
    }
}

impl DocumentValue {
    /// A single default block with an empty text run.
    pub fn empty() -> Self {
        Self::from_text("")
    }

    /// A single default block holding `text` as its only run.
    pub fn from_text(text: &str) -> Self {
        DocumentValue(vec![ValueNode::Element(ValueElement {
            kind: None,
            children: vec![ValueNode::Text(ValueText {
                text: text.to_string(),
                ..ValueText::default()
            })],
        })])
    }

    /// Parses a JSON value (array, string or null).
    pub fn from_json(json: &str) -> DocResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serializes the value as pretty JSON.
    pub fn to_json(&self) -> DocResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Returns the top-level nodes.
    pub fn nodes(&self) -> &[ValueNode] {
        &self.0
    }
}

impl Default for DocumentValue {
    fn default() -> Self {
        Self::empty()
    }
}

// ==================== Value -> Document ====================

impl Document {
    /// Builds a document from an exchanged value.
    ///
    /// Malformed nesting is flattened rather than rejected: inline leaves at
    /// block level are gathered into a block, and elements nested inside a
    /// block contribute their inline content.
    pub fn from_value(value: &DocumentValue) -> Self {
        let mut blocks = Vec::new();
        collect_blocks(&value.0, None, &mut blocks);
        Document::from_blocks(blocks)
    }

    /// Converts the document into its exchanged form.
    pub fn to_value(&self) -> DocumentValue {
        let mut nodes: Vec<ValueNode> = Vec::new();
        let mut open_list: Option<(ListKind, ValueElement)> = None;

        for block in self.blocks() {
            let element = block_element(block);
            match (block.list, open_list.as_mut()) {
                (Some(kind), Some((open_kind, container))) if kind == *open_kind => {
                    container.children.push(ValueNode::Element(element));
                }
                (list, _) => {
                    if let Some((_, container)) = open_list.take() {
                        nodes.push(ValueNode::Element(container));
                    }
                    match list {
                        Some(kind) => {
                            open_list = Some((
                                kind,
                                ValueElement {
                                    kind: Some(kind.into()),
                                    children: vec![ValueNode::Element(element)],
                                },
                            ));
                        }
                        None => nodes.push(ValueNode::Element(element)),
                    }
                }
            }
        }
        if let Some((_, container)) = open_list {
            nodes.push(ValueNode::Element(container));
        }

        DocumentValue(nodes)
    }
}

fn collect_blocks(nodes: &[ValueNode], list: Option<ListKind>, out: &mut Vec<Block>) {
    let mut loose: Vec<Inline> = Vec::new();

    for node in nodes {
        match node {
            ValueNode::Element(element) => {
                flush_loose(&mut loose, list, out);
                match element.kind.as_ref().and_then(ElementKind::container) {
                    Some(container) => collect_blocks(&element.children, Some(container), out),
                    None => {
                        let kind = element
                            .kind
                            .map_or(BlockKind::Paragraph, |kind| kind.block_kind());
                        let mut children = Vec::new();
                        collect_inlines(&element.children, &mut children);
                        out.push(Block {
                            kind,
                            list,
                            children,
                        });
                    }
                }
            }
            leaf => collect_inlines(std::slice::from_ref(leaf), &mut loose),
        }
    }
    flush_loose(&mut loose, list, out);
}

fn flush_loose(loose: &mut Vec<Inline>, list: Option<ListKind>, out: &mut Vec<Block>) {
    if loose.is_empty() {
        return;
    }
    let kind = if list.is_some() {
        BlockKind::ListItem
    } else {
        BlockKind::Paragraph
    };
    out.push(Block {
        kind,
        list,
        children: std::mem::take(loose),
    });
}

fn collect_inlines(nodes: &[ValueNode], out: &mut Vec<Inline>) {
    for node in nodes {
        match node {
            ValueNode::Text(text) => out.push(Inline::Text(TextRun::with_marks(
                text.text.clone(),
                Marks {
                    bold: text.bold.unwrap_or(false),
                    italic: text.italic.unwrap_or(false),
                },
            ))),
            ValueNode::Entity(entity) => out.push(Inline::Entity(entity.into())),
            ValueNode::Element(element) => collect_inlines(&element.children, out),
        }
    }
}

// ==================== Document -> Value ====================

fn block_element(block: &Block) -> ValueElement {
    let mut children = Vec::with_capacity(block.children.len() + 2);
    for inline in &block.children {
        // Entities are always surrounded by text leaves in the exchanged form.
        if inline.is_atomic() && !matches!(children.last(), Some(ValueNode::Text(_))) {
            children.push(ValueNode::Text(ValueText::empty()));
        }
        children.push(match inline {
            Inline::Text(run) => ValueNode::Text(ValueText {
                text: run.text.clone(),
                bold: run.marks.bold.then_some(true),
                italic: run.marks.italic.then_some(true),
            }),
            Inline::Entity(entity) => ValueNode::Entity(entity.into()),
        });
    }
    if !matches!(children.last(), Some(ValueNode::Text(_))) {
        children.push(ValueNode::Text(ValueText::empty()));
    }

    ValueElement {
        kind: block.kind.into(),
        children,
    }
}

impl From<&ValueEntity> for InlineEntity {
    fn from(entity: &ValueEntity) -> Self {
        match entity {
            ValueEntity::Record { record, .. } => InlineEntity::Record(record.clone()),
            ValueEntity::Page { page, .. } => InlineEntity::Page(page.clone()),
            ValueEntity::Roller { dice, .. } => InlineEntity::Dice(DiceRoll::new(dice.clone())),
        }
    }
}

impl From<&InlineEntity> for ValueEntity {
    fn from(entity: &InlineEntity) -> Self {
        match entity {
            InlineEntity::Record(record) => ValueEntity::Record {
                record: record.clone(),
                children: void_children(),
            },
            InlineEntity::Page(page) => ValueEntity::Page {
                page: page.clone(),
                children: void_children(),
            },
            InlineEntity::Dice(dice) => ValueEntity::Roller {
                dice: dice.expression.clone(),
                children: void_children(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{PageKey, RecordId};
    use crate::Point;

    #[test]
    fn test_plain_string_normalizes_to_paragraph() {
        let value = DocumentValue::from_json(r#""hello there""#).unwrap();
        assert_eq!(value, DocumentValue::from_text("hello there"));

        let doc = Document::from_value(&value);
        assert_eq!(doc.len_blocks(), 1);
        assert_eq!(doc.block(0).unwrap().kind, BlockKind::Paragraph);
        assert_eq!(doc.plain_text(), "hello there");
    }

    #[test]
    fn test_null_and_empty_normalize_to_empty_paragraph() {
        for json in ["null", "[]", r#""""#] {
            let value = DocumentValue::from_json(json).unwrap();
            assert_eq!(value, DocumentValue::empty());
            assert!(Document::from_value(&value).is_blank());
        }
    }

    #[test]
    fn test_parses_entities_and_containers() {
        let json = r#"[
            { "type": "h1", "children": [{ "text": "Title", "bold": true }] },
            { "type": "list", "children": [
                { "type": "list-item", "children": [
                    { "text": "" },
                    { "type": "record", "record": { "__id": "r1", "name": "Goblin" }, "children": [{ "text": "" }] },
                    { "text": " rolls " },
                    { "type": "roller", "dice": "2d6", "children": [{ "text": "" }] }
                ]}
            ]},
            { "children": [{ "type": "page", "page": { "key": "p1", "name": "Town" }, "children": [{ "text": "" }] }] }
        ]"#;
        let doc = Document::from_value(&DocumentValue::from_json(json).unwrap());
        assert_eq!(doc.len_blocks(), 3);

        let heading = doc.block(0).unwrap();
        assert_eq!(heading.kind, BlockKind::Heading1);
        assert!(matches!(&heading.children[0], Inline::Text(run) if run.marks.bold));

        let item = doc.block(1).unwrap();
        assert_eq!(item.kind, BlockKind::ListItem);
        assert_eq!(item.list, Some(ListKind::Unordered));
        assert_eq!(item.len(), 9);
        assert_eq!(
            doc.entity_at(Point::new(1, 0)),
            Some(&InlineEntity::Record(RecordRef {
                id: RecordId::new("r1"),
                name: "Goblin".into(),
            }))
        );

        assert_eq!(
            doc.entity_at(Point::new(2, 0)),
            Some(&InlineEntity::Page(PageRef {
                key: PageKey::new("p1"),
                name: "Town".into(),
            }))
        );
    }

    #[test]
    fn test_to_value_groups_list_items() {
        let doc = Document::from_blocks(vec![
            Block::list_item(ListKind::Ordered, "one"),
            Block::list_item(ListKind::Ordered, "two"),
            Block::paragraph("after"),
        ]);
        let value = doc.to_value();
        assert_eq!(value.nodes().len(), 2);

        let ValueNode::Element(container) = &value.nodes()[0] else {
            panic!("expected a container element");
        };
        assert_eq!(container.kind, Some(ElementKind::OrderedList));
        assert_eq!(container.children.len(), 2);
        assert_eq!(Document::from_value(&value), doc);
    }

    #[test]
    fn test_entities_are_wrapped_in_text_leaves() {
        let doc = Document::from_blocks(vec![
            Block::new(BlockKind::Paragraph).push(InlineEntity::Dice(DiceRoll::new("d8"))),
        ]);
        let json = doc.to_value().to_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        let children = parsed[0]["children"].as_array().unwrap();
        assert_eq!(children.len(), 3);
        assert_eq!(children[1]["type"], "roller");
        assert_eq!(children[1]["dice"], "d8");
        assert!(parsed[0].get("type").is_none());
    }

    #[test]
    fn test_unordered_serializes_with_canonical_name() {
        let doc = Document::from_blocks(vec![Block::list_item(ListKind::Unordered, "x")]);
        let json = doc.to_value().to_json().unwrap();
        assert!(json.contains("\"unordered-list\""));
    }

    #[test]
    fn test_unknown_type_reads_as_paragraph() {
        let value = DocumentValue::from_json(
            r#"[
                { "type": "h1", "children": [{ "text": "Title" }] },
                { "type": "divider", "children": [{ "text": "body" }] }
            ]"#,
        )
        .unwrap();
        let doc = Document::from_value(&value);

        assert_eq!(doc.len_blocks(), 2);
        assert_eq!(doc.block(0).unwrap().kind, BlockKind::Heading1);
        let body = doc.block(1).unwrap();
        assert_eq!(body.kind, BlockKind::Paragraph);
        assert_eq!(body.list, None);
        assert_eq!(body.plain_text(), "body");
    }
}
