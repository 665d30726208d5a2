//! Ranges and selections.
//!
//! ## Learning: Range Types
//!
//! Rust's standard library has `Range<T>` (exclusive end) and
//! `RangeInclusive<T>` (inclusive end). For text, we use exclusive
//! ranges because:
//! - Empty ranges (start == end) are natural
//! - Easier arithmetic (length = end - start)
//! - Consistent with slice semantics

use crate::Point;
use serde::{Deserialize, Serialize};

/// A normalized span of the document.
///
/// The start is always before or equal to the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    /// Start point (inclusive)
    pub start: Point,
    /// End point (exclusive)
    pub end: Point,
}

impl Range {
    /// Creates a new range.
    ///
    /// Automatically normalizes so start <= end.
    pub fn new(start: Point, end: Point) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Creates a zero-width range.
    pub fn collapsed(point: Point) -> Self {
        Self {
            start: point,
            end: point,
        }
    }

    /// Returns true if this is a zero-width range.
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Returns true if the range spans multiple blocks.
    pub fn is_multiblock(&self) -> bool {
        self.start.block != self.end.block
    }

    /// Returns true if a point is within this range.
    pub fn contains(&self, point: Point) -> bool {
        point >= self.start && point < self.end
    }

    /// Indices of every block the range touches.
    pub fn blocks(&self) -> std::ops::RangeInclusive<usize> {
        self.start.block..=self.end.block
    }
}

impl Default for Range {
    fn default() -> Self {
        Self::collapsed(Point::ZERO)
    }
}

/// Represents the direction of a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionDirection {
    /// Selection extends forward (focus at end)
    Forward,
    /// Selection extends backward (focus at start)
    Backward,
}

/// A selection with direction information.
///
/// The anchor is where the selection started and the focus is where the
/// cursor is. A collapsed selection is just a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    /// The anchor point (where selection started)
    pub anchor: Point,
    /// The focus point (where the cursor is)
    pub focus: Point,
}

impl Selection {
    /// Creates a new directed selection.
    pub fn new(anchor: Point, focus: Point) -> Self {
        Self { anchor, focus }
    }

    /// Creates a cursor (zero-width selection).
    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point,
            focus: point,
        }
    }

    /// Returns the direction of the selection.
    pub fn direction(&self) -> SelectionDirection {
        if self.anchor <= self.focus {
            SelectionDirection::Forward
        } else {
            SelectionDirection::Backward
        }
    }

    /// Returns the normalized range covered by the selection.
    pub fn range(&self) -> Range {
        Range::new(self.anchor, self.focus)
    }

    /// Returns the start point.
    pub fn start(&self) -> Point {
        self.anchor.min(self.focus)
    }

    /// Returns the end point.
    pub fn end(&self) -> Point {
        self.anchor.max(self.focus)
    }

    /// Returns true if this is a zero-width selection.
    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Extends the selection to a new focus point.
    pub fn extend_to(&mut self, point: Point) {
        self.focus = point;
    }

    /// Collapses the selection onto a point.
    pub fn collapse_to(&mut self, point: Point) {
        self.anchor = point;
        self.focus = point;
    }
}

impl From<Range> for Selection {
    fn from(range: Range) -> Self {
        Self {
            anchor: range.start,
            focus: range.end,
        }
    }
}
