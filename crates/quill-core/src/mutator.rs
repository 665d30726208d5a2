//! Structural edits layered on the document kernel.
//!
//! Every operation here is all-or-nothing: it runs inside
//! [`Document::transaction`], so either the whole edit lands or the
//! document is left exactly as it was. A half-applied commit (text deleted,
//! entity missing) can never be observed.

use quill_doc::{
    BlockKind, Document, InlineEntity, ListKind, Mark, Marks, Point, Range, Selection,
};
use serde::{Deserialize, Serialize};

use crate::CoreResult;
use crate::matcher::{Autoformat, DiceMatch};

/// A block format a shortcut can toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockFormat {
    H1,
    H2,
    H3,
    Quote,
    Callout,
    OrderedList,
    UnorderedList,
}

impl BlockFormat {
    /// Returns the list container this format toggles, if any.
    pub fn list(&self) -> Option<ListKind> {
        match self {
            BlockFormat::OrderedList => Some(ListKind::Ordered),
            BlockFormat::UnorderedList => Some(ListKind::Unordered),
            _ => None,
        }
    }

    /// Returns the block kind this format sets.
    pub fn block_kind(&self) -> BlockKind {
        match self {
            BlockFormat::H1 => BlockKind::Heading1,
            BlockFormat::H2 => BlockKind::Heading2,
            BlockFormat::H3 => BlockKind::Heading3,
            BlockFormat::Quote => BlockKind::Quote,
            BlockFormat::Callout => BlockKind::Callout,
            BlockFormat::OrderedList | BlockFormat::UnorderedList => BlockKind::ListItem,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockFormat::H1 => "h1",
            BlockFormat::H2 => "h2",
            BlockFormat::H3 => "h3",
            BlockFormat::Quote => "quote",
            BlockFormat::Callout => "callout",
            BlockFormat::OrderedList => "ordered-list",
            BlockFormat::UnorderedList => "unordered-list",
        }
    }

    /// Parses a format name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "h1" => Some(BlockFormat::H1),
            "h2" => Some(BlockFormat::H2),
            "h3" => Some(BlockFormat::H3),
            "quote" => Some(BlockFormat::Quote),
            "callout" => Some(BlockFormat::Callout),
            "ordered-list" => Some(BlockFormat::OrderedList),
            "unordered-list" | "list" => Some(BlockFormat::UnorderedList),
            _ => None,
        }
    }
}

// ==================== Marks ====================

/// Toggles a character mark over the selection.
///
/// The mark counts as active only if *every* selected character carries
/// it; an active mark is cleared, anything else sets it. Runs are split at
/// the selection edges so text outside keeps its formatting.
///
/// On a collapsed selection nothing is stored in the document; the toggle
/// goes into `pending`, which the next typed text picks up.
pub fn toggle_format_mark(
    doc: &mut Document,
    selection: &Selection,
    pending: &mut Option<Marks>,
    mark: Mark,
) -> CoreResult<()> {
    if selection.is_collapsed() {
        let base = pending.unwrap_or_else(|| doc.marks_at(selection.focus));
        *pending = Some(base.with(mark, !base.has(mark)));
        return Ok(());
    }

    let range = selection.range();
    let active = doc.is_mark_active(range, mark);
    doc.transaction(|draft| draft.set_mark(range, mark, !active))?;
    tracing::debug!(?mark, active = !active, "Toggled mark");
    Ok(())
}

// ==================== Blocks ====================

/// Toggles a block format on every block the selection touches.
///
/// Non-list formats set the kind, or reset to the default kind when all
/// touched blocks already have it. List formats first unwrap the touched
/// blocks from whatever list they are in (siblings outside the selection
/// keep theirs), then wrap them in the requested container; toggling a
/// list off leaves default blocks.
pub fn toggle_block_type(
    doc: &mut Document,
    selection: &Selection,
    format: BlockFormat,
) -> CoreResult<()> {
    let range = selection.range();
    doc.validate_range(range)?;

    let kind = format.block_kind();
    let list = format.list();
    let active = range.blocks().all(|idx| {
        doc.block(idx).is_ok_and(|block| match list {
            Some(list) => block.list == Some(list),
            None => block.kind == kind,
        })
    });

    doc.transaction(|draft| {
        for idx in range.blocks() {
            match (list, active) {
                (Some(_), true) => {
                    draft.set_block_list(idx, None)?;
                    draft.set_block_kind(idx, BlockKind::Paragraph)?;
                }
                (Some(_), false) => {
                    draft.set_block_list(idx, list)?;
                    draft.set_block_kind(idx, kind)?;
                }
                (None, true) => draft.set_block_kind(idx, BlockKind::Paragraph)?,
                (None, false) => draft.set_block_kind(idx, kind)?,
            }
        }
        Ok(())
    })?;

    tracing::debug!(format = format.as_str(), active = !active, "Toggled block");
    Ok(())
}

/// Makes a block a list item in a container of the given kind.
pub fn convert_to_list(doc: &mut Document, block: usize, list: ListKind) -> CoreResult<()> {
    doc.transaction(|draft| {
        draft.set_block_list(block, Some(list))?;
        draft.set_block_kind(block, BlockKind::ListItem)
    })?;
    Ok(())
}

/// Lifts a block out of its formatting.
///
/// A list item leaves its list; any other non-default block is reset to
/// the default kind. Returns false, changing nothing, for a plain block.
pub fn lift_block(doc: &mut Document, block: usize) -> CoreResult<bool> {
    let current = doc.block(block)?;
    if !current.is_in_list() && current.kind == BlockKind::Paragraph {
        return Ok(false);
    }
    doc.transaction(|draft| {
        draft.set_block_list(block, None)?;
        draft.set_block_kind(block, BlockKind::Paragraph)
    })?;
    Ok(true)
}

/// Returns true if [`lift_block`] would change the block.
pub fn can_lift(doc: &Document, block: usize) -> bool {
    doc.block(block)
        .is_ok_and(|b| b.is_in_list() || b.kind != BlockKind::Paragraph)
}

// ==================== Inline entities ====================

/// Replaces a range with an atomic entity.
///
/// Returns the point right after the entity; the selection collapses
/// there.
pub fn insert_inline_entity(
    doc: &mut Document,
    selection: &mut Selection,
    range: Range,
    entity: InlineEntity,
) -> CoreResult<Point> {
    let after = doc.transaction(|draft| {
        let at = draft.delete_range(range)?;
        draft.insert_inline(at, entity)
    })?;
    selection.collapse_to(after);
    Ok(after)
}

/// Replaces a dice token with a roller.
///
/// The closing paren the token ended with is typed back after the roller.
/// The opening parens are typed back before it when `reemit_open` is set;
/// otherwise they are consumed with the token.
pub fn insert_dice(
    doc: &mut Document,
    selection: &mut Selection,
    range: Range,
    dice: &DiceMatch,
    reemit_open: bool,
) -> CoreResult<Point> {
    let after = doc.transaction(|draft| {
        let mut at = draft.delete_range(range)?;
        if dice.open_parens > 0 && reemit_open {
            at = draft.insert_text(at, &"(".repeat(dice.open_parens), None)?;
        }
        at = draft.insert_inline(
            at,
            InlineEntity::Dice(quill_doc::DiceRoll::new(dice.expression.clone())),
        )?;
        if dice.close_paren {
            at = draft.insert_text(at, ")", None)?;
        }
        Ok(at)
    })?;
    selection.collapse_to(after);
    Ok(after)
}

/// Applies a Space-triggered autoformat to the token range.
pub fn apply_autoformat(
    doc: &mut Document,
    selection: &mut Selection,
    range: Range,
    autoformat: &Autoformat,
    reemit_open: bool,
) -> CoreResult<Point> {
    match autoformat {
        Autoformat::Dice(dice) => insert_dice(doc, selection, range, dice, reemit_open),
        Autoformat::List(list) => {
            let at = doc.transaction(|draft| {
                let at = draft.delete_range(range)?;
                draft.set_block_list(at.block, Some(*list))?;
                draft.set_block_kind(at.block, BlockKind::ListItem)?;
                Ok(at)
            })?;
            selection.collapse_to(at);
            Ok(at)
        }
        Autoformat::Heading(kind) => {
            let at = doc.transaction(|draft| {
                let at = draft.delete_range(range)?;
                draft.set_block_kind(at.block, *kind)?;
                Ok(at)
            })?;
            selection.collapse_to(at);
            Ok(at)
        }
    }
}
