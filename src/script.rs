//! Key scripts for replaying input from the command line.
//!
//! A script is typed literally, except for `{...}` groups naming one key
//! press in keymap syntax:
//!
//! ```text
//! Meet @gob{Down}{Enter} and roll (2d6) {Shift+Enter}
//! ```
//!
//! `{{` types a literal `{`.

use quill_core::{Key, KeyPress};

/// Parses a script into key presses.
pub fn parse(script: &str) -> anyhow::Result<Vec<KeyPress>> {
    let mut keys = Vec::new();
    let mut chars = script.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                keys.push(KeyPress::char('{'));
            }
            '{' => {
                let name: String = chars.by_ref().take_while(|&c| c != '}').collect();
                let key = KeyPress::parse(&name)
                    .ok_or_else(|| anyhow::anyhow!("Unknown key in script: {{{}}}", name))?;
                keys.push(key);
            }
            '\n' => keys.push(KeyPress::plain(Key::Enter)),
            c => keys.push(KeyPress::char(c)),
        }
    }

    Ok(keys)
}
