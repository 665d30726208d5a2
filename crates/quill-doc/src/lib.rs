//! # Quill Doc
//!
//! Structured rich-text documents: blocks of text runs and atomic inline
//! entities, addressed by block/offset points.
//!
//! ## Key Concepts for Learning Rust
//!
//! ### Ownership & Borrowing
//! - `Document` owns its blocks; queries borrow (`&self`) and return
//!   references or copies, edits take `&mut self`
//! - Entity payloads (`RecordRef`, `PageRef`) are *copied* into the
//!   document when inserted, so the document never borrows from a dataset
//!
//! ### Memory Safety
//! - Every point is validated before it is used to index a block
//! - Offsets count characters and entities, never bytes, so a point cannot
//!   split a UTF-8 sequence or land inside an entity

mod document;
mod node;
mod point;
mod selection;
mod value;

pub use document::{Document, Token};
pub use node::{
    Block, BlockKind, DiceRoll, INLINE_TRAITS, Inline, InlineEntity, InlineKind, InlineTraits,
    ListKind, Mark, Marks, PageKey, PageRef, RecordId, RecordRef, TextRun,
};
pub use point::{Point, Unit};
pub use selection::{Range, Selection, SelectionDirection};
pub use value::{DocumentValue, ElementKind, ValueElement, ValueEntity, ValueNode, ValueText};

/// Result type for document operations
pub type DocResult<T> = Result<T, DocError>;

/// Errors that can occur during document operations
#[derive(Debug, thiserror::Error)]
pub enum DocError {
    #[error("Point {0} is out of bounds")]
    PointOutOfBounds(Point),

    #[error("Block {0} does not exist")]
    BlockOutOfBounds(usize),

    #[error("Range is invalid: start {start} is after end {end}")]
    InvalidRange { start: Point, end: Point },

    #[error("Invalid document value: {0}")]
    InvalidValue(#[from] serde_json::Error),
}
