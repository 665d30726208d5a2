//! Point types for addressing positions in a document.
//!
//! ## Learning: Newtype Pattern
//!
//! `Point` is a struct that wraps block/offset coordinates.
//! This is better than using `(usize, usize)` because:
//! - Type safety: Can't accidentally swap block and offset
//! - Named fields: Self-documenting code
//! - Methods: Can add behavior specific to points
//!
//! ## Units
//!
//! Offsets count *units*, not bytes. Every character of a text run is one
//! unit and every inline entity is exactly one unit, so a point can never
//! land inside an entity.

use serde::{Deserialize, Serialize};

/// A position in the document (block index and unit offset).
///
/// Both fields are 0-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    /// Block index (0-indexed)
    pub block: usize,
    /// Offset within the block, in units
    pub offset: usize,
}

impl Point {
    /// Creates a new point.
    pub fn new(block: usize, offset: usize) -> Self {
        Self { block, offset }
    }

    /// Point at the start of the document.
    pub const ZERO: Point = Point {
        block: 0,
        offset: 0,
    };

    /// Returns true if this point is before another.
    pub fn is_before(&self, other: &Point) -> bool {
        self.block < other.block || (self.block == other.block && self.offset < other.offset)
    }

    /// Returns true if this point is after another.
    pub fn is_after(&self, other: &Point) -> bool {
        other.is_before(self)
    }

    /// Returns true if the point sits at the start of its block.
    pub fn is_block_start(&self) -> bool {
        self.offset == 0
    }

    /// Returns a point in the same block at another offset.
    pub fn with_offset(self, offset: usize) -> Point {
        Point {
            block: self.block,
            offset,
        }
    }
}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Point {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        match self.block.cmp(&other.block) {
            std::cmp::Ordering::Equal => self.offset.cmp(&other.offset),
            other => other,
        }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Blocks are 1-indexed for user-facing output
        write!(f, "{}:{}", self.block + 1, self.offset)
    }
}

/// Granularity used when stepping a point backward or forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    /// A single unit (character or inline entity)
    Character,
    /// A word, as delimited by Unicode word boundaries
    Word,
    /// A whole block
    Block,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_ordering() {
        let p1 = Point::new(1, 5);
        let p2 = Point::new(2, 3);
        let p3 = Point::new(1, 10);

        assert!(p1.is_before(&p2));
        assert!(p1.is_before(&p3));
        assert!(p2.is_after(&p1));
        assert!(p2.is_after(&p3));
        assert_eq!(p1.max(p2), p2);
        assert_eq!(p3.min(p1), p1);
    }

    #[test]
    fn test_point_display() {
        assert_eq!(Point::new(0, 4).to_string(), "1:4");
    }
}
