//! Formatting commands reachable from keyboard shortcuts.
//!
//! ## Learning: The Command Pattern
//!
//! Commands encapsulate actions as values:
//! - The keymap maps key presses to commands without knowing what they do
//! - Config files refer to commands by a stable string id
//! - The editor executes them in one place

use quill_doc::Mark;

use crate::mutator::BlockFormat;

/// A formatting action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Toggle a block format on the selected blocks
    ToggleBlock(BlockFormat),
    /// Toggle a character mark on the selection
    ToggleMark(Mark),
}

impl Command {
    /// Returns the human-readable name.
    pub fn display_name(&self) -> &'static str {
        match self {
            Command::ToggleBlock(BlockFormat::H1) => "Heading 1",
            Command::ToggleBlock(BlockFormat::H2) => "Heading 2",
            Command::ToggleBlock(BlockFormat::H3) => "Heading 3",
            Command::ToggleBlock(BlockFormat::Quote) => "Quote",
            Command::ToggleBlock(BlockFormat::Callout) => "Callout",
            Command::ToggleBlock(BlockFormat::OrderedList) => "Numbered List",
            Command::ToggleBlock(BlockFormat::UnorderedList) => "Bulleted List",
            Command::ToggleMark(Mark::Bold) => "Bold",
            Command::ToggleMark(Mark::Italic) => "Italic",
        }
    }

    /// Returns the id used in config files, e.g. `block.h1` or `mark.bold`.
    pub fn id(&self) -> String {
        match self {
            Command::ToggleBlock(format) => format!("block.{}", format.as_str()),
            Command::ToggleMark(Mark::Bold) => "mark.bold".to_string(),
            Command::ToggleMark(Mark::Italic) => "mark.italic".to_string(),
        }
    }

    /// Parses a command id.
    pub fn parse(s: &str) -> Option<Self> {
        let (group, name) = s.split_once('.')?;
        match (group, name) {
            ("block", format) => BlockFormat::parse(format).map(Command::ToggleBlock),
            ("mark", "bold") => Some(Command::ToggleMark(Mark::Bold)),
            ("mark", "italic") => Some(Command::ToggleMark(Mark::Italic)),
            _ => None,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}
