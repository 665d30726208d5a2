//! The document tree and its editing primitives.
//!
//! `Document` is the small structural kernel the binding engine is layered
//! on: it answers questions about the text around a point and performs the
//! low-level edits (insert, delete, split, merge, mark) that every higher
//! level operation is built from.
//!
//! ## Learning: Invariants Through Encapsulation
//!
//! The block list is private. Every mutation goes through a method that
//! validates its points first and re-normalizes the touched blocks after,
//! so outside code can never observe:
//! - a document with zero blocks
//! - two adjacent runs with identical marks
//! - an empty text run
//!
//! ## Learning: Transactions by Cloning
//!
//! [`Document::transaction`] runs a closure against a *copy* and only swaps
//! it in when the closure returns `Ok`. With `?` inside the closure, any
//! failed step leaves the original untouched.

use unicode_segmentation::UnicodeSegmentation;

use crate::node::{Block, BlockKind, Inline, InlineEntity, ListKind, Mark, Marks, TextRun};
use crate::{DocError, DocResult, Point, Range, Unit};

/// An ordered sequence of blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    blocks: Vec<Block>,
}

/// The run of non-whitespace text that ends at a point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The token's characters
    pub text: String,
    /// Where the token sits in the document
    pub range: Range,
}

impl Token {
    /// Returns true if nothing precedes the token in its block.
    pub fn starts_block(&self) -> bool {
        self.range.start.offset == 0
    }
}

impl Document {
    /// Creates a document holding a single empty default block.
    ///
    /// # Example
    /// ```
    /// use quill_doc::Document;
    ///
    /// let doc = Document::new();
    /// assert!(doc.is_blank());
    /// ```
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::default()],
        }
    }

    /// Creates a document from blocks, normalizing each one.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        let mut blocks = blocks;
        for block in &mut blocks {
            block.normalize();
        }
        if blocks.is_empty() {
            blocks.push(Block::default());
        }
        Self { blocks }
    }

    // ==================== Access ====================

    /// Returns all blocks.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Returns a block by index.
    pub fn block(&self, idx: usize) -> DocResult<&Block> {
        self.blocks.get(idx).ok_or(DocError::BlockOutOfBounds(idx))
    }

    fn block_mut(&mut self, idx: usize) -> DocResult<&mut Block> {
        self.blocks
            .get_mut(idx)
            .ok_or(DocError::BlockOutOfBounds(idx))
    }

    /// Returns the number of blocks.
    #[inline]
    pub fn len_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// Returns true if the document is a single block with no content.
    pub fn is_blank(&self) -> bool {
        self.blocks.len() == 1 && self.blocks[0].is_empty()
    }

    /// Point at the very end of the document.
    pub fn end_point(&self) -> Point {
        let last = self.blocks.len() - 1;
        Point::new(last, self.blocks[last].len())
    }

    /// Text of every block, one line per block.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(Block::plain_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Plain text within a range; entities contribute nothing and block
    /// boundaries become newlines.
    pub fn string(&self, range: Range) -> DocResult<String> {
        self.validate_range(range)?;
        let mut parts = Vec::new();
        for idx in range.blocks() {
            let block = &self.blocks[idx];
            let start = if idx == range.start.block {
                range.start.offset
            } else {
                0
            };
            let end = if idx == range.end.block {
                range.end.offset
            } else {
                block.len()
            };
            let text: String = block
                .slice(start, end)
                .iter()
                .filter_map(|inline| match inline {
                    Inline::Text(run) => Some(run.text.as_str()),
                    Inline::Entity(_) => None,
                })
                .collect();
            parts.push(text);
        }
        Ok(parts.join("\n"))
    }

    // ==================== Validation ====================

    /// Checks that a point addresses an existing position.
    pub fn validate(&self, point: Point) -> DocResult<()> {
        let block = self.block(point.block)?;
        if point.offset > block.len() {
            return Err(DocError::PointOutOfBounds(point));
        }
        Ok(())
    }

    /// Checks both ends of a range.
    pub fn validate_range(&self, range: Range) -> DocResult<()> {
        if range.start > range.end {
            return Err(DocError::InvalidRange {
                start: range.start,
                end: range.end,
            });
        }
        self.validate(range.start)?;
        self.validate(range.end)
    }

    /// Pulls a point back inside the document.
    pub fn clamp(&self, point: Point) -> Point {
        let block = point.block.min(self.blocks.len() - 1);
        let offset = point.offset.min(self.blocks[block].len());
        Point::new(block, offset)
    }

    // ==================== Queries Around a Point ====================

    /// Returns the inline node occupying the unit right after a point.
    pub fn inline_at(&self, point: Point) -> Option<&Inline> {
        let block = self.blocks.get(point.block)?;
        let mut remaining = point.offset;
        for inline in &block.children {
            let len = inline.unit_len();
            if remaining < len {
                return Some(inline);
            }
            remaining -= len;
        }
        None
    }

    /// Returns the inline node occupying the unit right before a point.
    pub fn inline_before(&self, point: Point) -> Option<&Inline> {
        if point.offset == 0 {
            return None;
        }
        self.inline_at(point.with_offset(point.offset - 1))
    }

    /// Returns the entity occupying the unit right after a point.
    pub fn entity_at(&self, point: Point) -> Option<&InlineEntity> {
        match self.inline_at(point) {
            Some(Inline::Entity(entity)) => Some(entity),
            _ => None,
        }
    }

    /// Marks that text typed at this point would inherit.
    pub fn marks_at(&self, point: Point) -> Marks {
        match (self.inline_before(point), self.inline_at(point)) {
            (Some(Inline::Text(run)), _) => run.marks,
            (_, Some(Inline::Text(run))) => run.marks,
            _ => Marks::NONE,
        }
    }

    /// Returns true if every character in the range carries the mark.
    ///
    /// A collapsed range reports the marks at that point; a range holding no
    /// text at all is never active.
    pub fn is_mark_active(&self, range: Range, mark: Mark) -> bool {
        if range.is_collapsed() {
            return self.marks_at(range.start).has(mark);
        }
        if self.validate_range(range).is_err() {
            return false;
        }

        let mut seen_text = false;
        for idx in range.blocks() {
            let block = &self.blocks[idx];
            let (start, end) = local_bounds(block, idx, range);
            for inline in block.slice(start, end) {
                if let Inline::Text(run) = inline {
                    if !run.marks.has(mark) {
                        return false;
                    }
                    seen_text = true;
                }
            }
        }
        seen_text
    }

    /// Text since the last entity (or block start) up to a point.
    fn segment_before(&self, point: Point) -> Option<String> {
        let block = self.blocks.get(point.block)?;
        let mut segment = String::new();
        let mut consumed = 0;
        for inline in &block.children {
            if consumed >= point.offset {
                break;
            }
            match inline {
                Inline::Entity(_) => {
                    consumed += inline.unit_len();
                    segment.clear();
                }
                Inline::Text(run) => {
                    let take = (point.offset - consumed).min(run.len());
                    segment.extend(run.text.chars().take(take));
                    consumed += take;
                }
            }
        }
        (consumed == point.offset).then_some(segment)
    }

    /// Text from a point up to the next entity (or block end).
    fn segment_after(&self, point: Point) -> Option<String> {
        let block = self.blocks.get(point.block)?;
        let tail = block.slice(point.offset, block.len());
        let mut segment = String::new();
        for inline in tail {
            match inline {
                Inline::Text(run) => segment.push_str(&run.text),
                Inline::Entity(_) => break,
            }
        }
        Some(segment)
    }

    /// Returns the run of non-whitespace text ending exactly at a point.
    ///
    /// The token never crosses whitespace, an inline entity or the start of
    /// the block.
    pub fn token_before(&self, point: Point) -> Option<Token> {
        let segment = self.segment_before(point)?;
        let chars: Vec<char> = segment.chars().collect();
        let start = chars
            .iter()
            .rposition(|c| c.is_whitespace())
            .map_or(0, |idx| idx + 1);
        let token_len = chars.len() - start;
        if token_len == 0 {
            return None;
        }

        Some(Token {
            text: chars[start..].iter().collect(),
            range: Range::new(point.with_offset(point.offset - token_len), point),
        })
    }

    /// Steps a point backward by one unit of the given granularity.
    ///
    /// Returns `None` at the start of the document.
    pub fn before(&self, point: Point, unit: Unit) -> Option<Point> {
        if point.offset == 0 {
            return match (unit, point.block) {
                (_, 0) => None,
                (Unit::Block, block) => Some(Point::new(block - 1, 0)),
                (_, block) => Some(Point::new(block - 1, self.blocks.get(block - 1)?.len())),
            };
        }

        match unit {
            Unit::Character => Some(point.with_offset(point.offset - 1)),
            Unit::Block => Some(point.with_offset(0)),
            Unit::Word => {
                let segment = self.segment_before(point)?;
                if segment.is_empty() {
                    // An entity sits right before the point.
                    return Some(point.with_offset(point.offset - 1));
                }
                let segment_len = segment.chars().count();
                let word_start = segment
                    .split_word_bound_indices()
                    .filter(|(_, word)| !word.trim().is_empty())
                    .last()
                    .map_or(0, |(byte, _)| segment[..byte].chars().count());
                Some(point.with_offset(point.offset - (segment_len - word_start)))
            }
        }
    }

    /// Steps a point forward by one unit of the given granularity.
    ///
    /// Returns `None` at the end of the document.
    pub fn after(&self, point: Point, unit: Unit) -> Option<Point> {
        let len = self.blocks.get(point.block)?.len();
        if point.offset >= len {
            let next = point.block + 1;
            return match unit {
                _ if next >= self.blocks.len() => None,
                Unit::Block => Some(Point::new(next, self.blocks[next].len())),
                _ => Some(Point::new(next, 0)),
            };
        }

        match unit {
            Unit::Character => Some(point.with_offset(point.offset + 1)),
            Unit::Block => Some(point.with_offset(len)),
            Unit::Word => {
                let segment = self.segment_after(point)?;
                if segment.is_empty() {
                    return Some(point.with_offset(point.offset + 1));
                }
                let word_end = segment
                    .split_word_bound_indices()
                    .find(|(_, word)| !word.trim().is_empty())
                    .map_or(segment.chars().count(), |(byte, word)| {
                        segment[..byte + word.len()].chars().count()
                    });
                Some(point.with_offset(point.offset + word_end))
            }
        }
    }

    /// Moves a point by a signed number of units, stopping at the ends.
    pub fn move_point(&self, point: Point, distance: isize) -> Point {
        let mut current = self.clamp(point);
        for _ in 0..distance.unsigned_abs() {
            let next = if distance < 0 {
                self.before(current, Unit::Character)
            } else {
                self.after(current, Unit::Character)
            };
            match next {
                Some(point) => current = point,
                None => break,
            }
        }
        current
    }

    // ==================== Mutations ====================

    /// Inserts text at a point and returns the point after it.
    ///
    /// Newlines split the block. Without explicit marks the text inherits
    /// the marks at the insertion point.
    pub fn insert_text(&mut self, point: Point, text: &str, marks: Option<Marks>) -> DocResult<Point> {
        self.validate(point)?;
        let marks = marks.unwrap_or_else(|| self.marks_at(point));
        let text = text.replace('\r', "");

        let mut cursor = point;
        for (idx, line) in text.split('\n').enumerate() {
            if idx > 0 {
                cursor = self.split_block(cursor)?;
            }
            cursor = self.insert_run(cursor, TextRun::with_marks(line, marks))?;
        }
        Ok(cursor)
    }

    fn insert_run(&mut self, point: Point, run: TextRun) -> DocResult<Point> {
        let len = run.len();
        let block = self.block_mut(point.block)?;
        let tail = block.split_off(point.offset);
        block.children.push(Inline::Text(run));
        block.children.extend(tail);
        block.normalize();
        Ok(point.with_offset(point.offset + len))
    }

    /// Inserts an atomic entity at a point and returns the point after it.
    pub fn insert_inline(&mut self, point: Point, entity: InlineEntity) -> DocResult<Point> {
        self.validate(point)?;
        let inline = Inline::Entity(entity);
        let len = inline.unit_len();
        let block = self.block_mut(point.block)?;
        let tail = block.split_off(point.offset);
        block.children.push(inline);
        block.children.extend(tail);
        block.normalize();
        Ok(point.with_offset(point.offset + len))
    }

    /// Deletes everything in a range and returns the collapsed point.
    ///
    /// A range spanning several blocks merges the remainder of the last one
    /// into the first, which keeps its own formatting.
    pub fn delete_range(&mut self, range: Range) -> DocResult<Point> {
        self.validate_range(range)?;
        if range.is_collapsed() {
            return Ok(range.start);
        }

        let Range { start, end } = range;
        let tail = self.blocks[end.block].split_off(end.offset);
        let _ = self.blocks[start.block].split_off(start.offset);
        if start.block != end.block {
            self.blocks.drain(start.block + 1..=end.block);
        }

        let block = &mut self.blocks[start.block];
        block.children.extend(tail);
        block.normalize();
        Ok(start)
    }

    /// Deletes one unit of the given granularity before a point.
    ///
    /// At the start of a block this merges it into the previous one.
    pub fn delete_backward(&mut self, point: Point, unit: Unit) -> DocResult<Point> {
        self.validate(point)?;
        match self.before(point, unit) {
            Some(prev) => self.delete_range(Range::new(prev, point)),
            None => Ok(point),
        }
    }

    /// Deletes one unit of the given granularity after a point.
    pub fn delete_forward(&mut self, point: Point, unit: Unit) -> DocResult<Point> {
        self.validate(point)?;
        match self.after(point, unit) {
            Some(next) => self.delete_range(Range::new(point, next)),
            None => Ok(point),
        }
    }

    /// Splits a block in two at a point and returns the start of the new
    /// block. The new block inherits kind and list membership.
    pub fn split_block(&mut self, point: Point) -> DocResult<Point> {
        self.validate(point)?;
        let block = self.block_mut(point.block)?;
        let tail = block.split_off(point.offset);
        block.normalize();

        let mut next = Block {
            kind: block.kind,
            list: block.list,
            children: tail,
        };
        next.normalize();
        self.blocks.insert(point.block + 1, next);
        Ok(Point::new(point.block + 1, 0))
    }

    /// Sets or clears a mark on every text run inside a range.
    ///
    /// Runs are split at the range boundaries so text outside the range
    /// keeps its marks.
    pub fn set_mark(&mut self, range: Range, mark: Mark, value: bool) -> DocResult<()> {
        self.validate_range(range)?;
        for idx in range.blocks() {
            let block = &mut self.blocks[idx];
            let (start, end) = local_bounds(block, idx, range);
            let tail = block.split_off(end);
            let mut middle = block.split_off(start);
            for inline in &mut middle {
                if let Inline::Text(run) = inline {
                    run.marks.set(mark, value);
                }
            }
            block.children.extend(middle);
            block.children.extend(tail);
            block.normalize();
        }
        Ok(())
    }

    /// Sets the formatting of a block.
    pub fn set_block_kind(&mut self, idx: usize, kind: BlockKind) -> DocResult<()> {
        self.block_mut(idx)?.kind = kind;
        Ok(())
    }

    /// Moves a block into (or out of) a list container.
    pub fn set_block_list(&mut self, idx: usize, list: Option<ListKind>) -> DocResult<()> {
        self.block_mut(idx)?.list = list;
        Ok(())
    }

    /// Runs a group of edits atomically.
    ///
    /// The closure works on a draft copy; the document only changes when
    /// the closure succeeds.
    pub fn transaction<T, F>(&mut self, f: F) -> DocResult<T>
    where
        F: FnOnce(&mut Document) -> DocResult<T>,
    {
        let mut draft = self.clone();
        let out = f(&mut draft)?;
        *self = draft;
        Ok(out)
    }
}

/// Offsets of a range clipped to one block.
fn local_bounds(block: &Block, idx: usize, range: Range) -> (usize, usize) {
    let start = if idx == range.start.block {
        range.start.offset
    } else {
        0
    };
    let end = if idx == range.end.block {
        range.end.offset
    } else {
        block.len()
    };
    (start, end)
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for Document {
    fn from(s: &str) -> Self {
        Self::from_blocks(s.lines().map(Block::paragraph).collect())
    }
}
