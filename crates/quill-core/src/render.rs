//! Plain-text rendering for terminal shells and tests.
//!
//! Produces a markdown-flavored view of a document:
//!
//! ```text
//! # Heading          > quote            1. ordered item
//! **bold** _italic_  @[Record] #[Page]  [roll 2d6]
//! ```
//!
//! The output is for display only; it is not parsed back.

use std::fmt::Write;

use quill_doc::{Block, BlockKind, Document, Inline, InlineEntity, ListKind, Point};

use crate::binding::BindingState;

/// Marker drawn at the cursor when requested.
pub const CURSOR: char = '|';

/// Renders the document, one line per block.
///
/// When `cursor` is given, [`CURSOR`] is drawn at that point.
pub fn render_document(doc: &Document, cursor: Option<Point>) -> String {
    let mut out = String::new();
    let mut ordinal = 0;

    for (idx, block) in doc.blocks().iter().enumerate() {
        ordinal = match block.list {
            Some(ListKind::Ordered) => ordinal + 1,
            _ => 0,
        };
        if idx > 0 {
            out.push('\n');
        }
        out.push_str(&block_prefix(block, ordinal));
        let caret = cursor.filter(|p| p.block == idx).map(|p| p.offset);
        render_inlines(&mut out, block, caret);
    }
    out
}

fn block_prefix(block: &Block, ordinal: usize) -> String {
    match (block.list, block.kind) {
        (Some(ListKind::Ordered), _) => format!("{ordinal}. "),
        (Some(ListKind::Unordered), _) => "- ".to_string(),
        (None, BlockKind::Heading1) => "# ".to_string(),
        (None, BlockKind::Heading2) => "## ".to_string(),
        (None, BlockKind::Heading3) => "### ".to_string(),
        (None, BlockKind::Quote) => "> ".to_string(),
        (None, BlockKind::Callout) => "! ".to_string(),
        (None, BlockKind::Paragraph | BlockKind::ListItem) => String::new(),
    }
}

fn render_inlines(out: &mut String, block: &Block, caret: Option<usize>) {
    let mut offset = 0;
    for inline in &block.children {
        let len = inline.unit_len();
        match inline {
            Inline::Text(run) => {
                let (open, close) = match (run.marks.bold, run.marks.italic) {
                    (true, true) => ("**_", "_**"),
                    (true, false) => ("**", "**"),
                    (false, true) => ("_", "_"),
                    (false, false) => ("", ""),
                };
                out.push_str(open);
                for (i, c) in run.text.chars().enumerate() {
                    if caret == Some(offset + i) {
                        out.push(CURSOR);
                    }
                    out.push(c);
                }
                out.push_str(close);
            }
            Inline::Entity(entity) => {
                if caret == Some(offset) {
                    out.push(CURSOR);
                }
                out.push_str(&render_entity(entity));
            }
        }
        offset += len;
    }
    if caret == Some(offset) {
        out.push(CURSOR);
    }
}

/// Renders one inline entity.
pub fn render_entity(entity: &InlineEntity) -> String {
    match entity {
        InlineEntity::Record(record) => format!("@[{}]", record.name),
        InlineEntity::Page(page) => format!("#[{}]", page.name),
        InlineEntity::Dice(dice) => format!("[roll {}]", dice.expression),
    }
}

/// Renders the suggestion popup, marking the highlighted row with `>`.
///
/// Returns an empty string when nothing is matching.
pub fn render_suggestions(binding: &BindingState, max_visible: usize) -> String {
    let Some(active) = binding.active() else {
        return String::new();
    };

    let mut out = String::new();
    let _ = writeln!(out, "{} \"{}\"", active.matcher, active.query);
    for (idx, candidate) in binding.visible(max_visible).iter().enumerate() {
        let marker = if idx == binding.active_index() { '>' } else { ' ' };
        let _ = writeln!(out, "{marker} {}", candidate.label);
    }
    out
}
