//! # Quill Core
//!
//! The live text-to-entity binding engine layered on `quill-doc`.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                         Editor                            │
//! │  ┌──────────┐ ┌──────────┐ ┌─────────────┐ ┌───────────┐ │
//! │  │  Config  │ │  Keymap  │ │  EventBus   │ │  Dataset  │ │
//! │  └──────────┘ └──────────┘ └─────────────┘ └───────────┘ │
//! │        │                                                  │
//! │  ┌─────┴──────┐   ┌──────────┐   ┌──────────┐            │
//! │  │ Dispatcher │──>│ Matchers │──>│ Resolver │            │
//! │  └─────┬──────┘   └──────────┘   └────┬─────┘            │
//! │        │          ┌──────────────┐     │                  │
//! │        └─────────>│ BindingState │<────┘                  │
//! │                   └──────┬───────┘                        │
//! │                   ┌──────┴───────┐                        │
//! │                   │   Mutator    │──> quill_doc::Document │
//! │                   └──────────────┘                        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Learning: Module Organization
//!
//! Rust modules map to files:
//! - `mod foo;` looks for `foo.rs` or `foo/mod.rs`
//! - `pub use` re-exports items for cleaner public APIs

pub mod binding;
pub mod command;
pub mod config;
pub mod dataset;
pub mod dispatcher;
pub mod editor;
pub mod event;
pub mod keymap;
pub mod matcher;
pub mod mutator;
pub mod render;
pub mod resolver;

pub use binding::{BindingState, MatchDescriptor, Navigate};
pub use command::Command;
pub use config::{Config, ConfigError};
pub use dataset::{Dataset, DisplayName, InMemoryDataset, PageEntry, RecordEntry};
pub use dispatcher::{Dispatcher, KeyOutcome, Route};
pub use editor::{Editor, SessionId};
pub use event::{EditorEvent, EventBus, EventHandler, Notification};
pub use keymap::{Key, KeyBinding, KeyPress, Keymap, Modifiers};
pub use matcher::{Autoformat, DiceMatch, MatcherId};
pub use mutator::BlockFormat;
pub use render::{render_document, render_suggestions};
pub use resolver::{Candidate, Resolver};

/// Result type for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Document error: {0}")]
    Doc(#[from] quill_doc::DocError),

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("No active match to commit")]
    NoActiveMatch,
}
