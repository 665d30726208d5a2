//! Keyboard mapping and input handling.
//!
//! ## Learning: Lookup Tables Over Match Ladders
//!
//! Shortcut handling could be a long `match` on key and modifiers, but
//! then users could not rebind anything. Instead, bindings are data: a list
//! of `KeyBinding`s plus a `HashMap` index from key press to binding. User
//! bindings from the config are appended after the defaults and the index
//! is rebuilt, so a later binding for the same key press wins.

use crate::command::Command;
use crate::config::Config;
use crate::mutator::BlockFormat;
use quill_doc::Mark;
use std::collections::HashMap;

/// Keyboard modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool, // Cmd on macOS, Win on Windows
}

impl Modifiers {
    /// No modifiers pressed.
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        alt: false,
        shift: false,
        meta: false,
    };

    /// Ctrl modifier.
    pub const CTRL: Modifiers = Modifiers {
        ctrl: true,
        alt: false,
        shift: false,
        meta: false,
    };

    /// Shift modifier.
    pub const SHIFT: Modifiers = Modifiers {
        ctrl: false,
        alt: false,
        shift: true,
        meta: false,
    };

    /// Alt modifier.
    pub const ALT: Modifiers = Modifiers {
        ctrl: false,
        alt: true,
        shift: false,
        meta: false,
    };

    /// Meta (Cmd/Win) modifier.
    pub const META: Modifiers = Modifiers {
        ctrl: false,
        alt: false,
        shift: false,
        meta: true,
    };

    /// Returns true if no modifiers are pressed.
    pub fn is_empty(&self) -> bool {
        !self.ctrl && !self.alt && !self.shift && !self.meta
    }

    /// Returns true if every modifier in `other` is pressed.
    pub fn contains(&self, other: Modifiers) -> bool {
        (!other.ctrl || self.ctrl)
            && (!other.alt || self.alt)
            && (!other.shift || self.shift)
            && (!other.meta || self.meta)
    }

    /// Returns true if Ctrl or Meta is pressed.
    pub fn has_command(&self) -> bool {
        self.ctrl || self.meta
    }

    /// Parses modifiers from a string like "ctrl+shift".
    pub fn parse(s: &str) -> Self {
        let mut mods = Modifiers::NONE;
        for part in s.split('+') {
            match part.trim().to_lowercase().as_str() {
                "ctrl" | "control" => mods.ctrl = true,
                "alt" | "option" => mods.alt = true,
                "shift" => mods.shift = true,
                "meta" | "cmd" | "win" | "super" => mods.meta = true,
                _ => {}
            }
        }
        mods
    }
}

impl std::fmt::Display for Modifiers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("Ctrl");
        }
        if self.alt {
            parts.push("Alt");
        }
        if self.shift {
            parts.push("Shift");
        }
        if self.meta {
            parts.push("Meta");
        }
        write!(f, "{}", parts.join("+"))
    }
}

/// A key code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Space,
    Enter,
    Tab,
    Backspace,
    Delete,
    Escape,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
}

impl Key {
    /// Parses a key from a string.
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.to_lowercase();
        match lower.as_str() {
            "enter" | "return" => Some(Key::Enter),
            "tab" => Some(Key::Tab),
            "backspace" | "bs" => Some(Key::Backspace),
            "delete" | "del" => Some(Key::Delete),
            "escape" | "esc" => Some(Key::Escape),
            "up" | "arrowup" => Some(Key::Up),
            "down" | "arrowdown" => Some(Key::Down),
            "left" | "arrowleft" => Some(Key::Left),
            "right" | "arrowright" => Some(Key::Right),
            "home" => Some(Key::Home),
            "end" => Some(Key::End),
            "space" | " " => Some(Key::Space),
            _ => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(Key::Char(c)),
                    _ => None,
                }
            }
        }
    }
}

impl std::fmt::Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Char(c) => write!(f, "{}", c.to_uppercase()),
            Key::Space => write!(f, "Space"),
            Key::Enter => write!(f, "Enter"),
            Key::Tab => write!(f, "Tab"),
            Key::Backspace => write!(f, "Backspace"),
            Key::Delete => write!(f, "Delete"),
            Key::Escape => write!(f, "Escape"),
            Key::Up => write!(f, "Up"),
            Key::Down => write!(f, "Down"),
            Key::Left => write!(f, "Left"),
            Key::Right => write!(f, "Right"),
            Key::Home => write!(f, "Home"),
            Key::End => write!(f, "End"),
        }
    }
}

/// A key press event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyPress {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyPress {
    /// Creates a new key press.
    pub fn new(key: Key, modifiers: Modifiers) -> Self {
        Self { key, modifiers }
    }

    /// A key press without modifiers.
    pub fn plain(key: Key) -> Self {
        Self::new(key, Modifiers::NONE)
    }

    /// A typed character; `' '` becomes [`Key::Space`].
    pub fn char(c: char) -> Self {
        match c {
            ' ' => Self::plain(Key::Space),
            c => Self::plain(Key::Char(c)),
        }
    }

    /// Parses a key binding string like "meta+b" or "shift+enter".
    pub fn parse(s: &str) -> Option<Self> {
        // A trailing "+" is the plus key itself: "ctrl++"
        let (mod_str, key_str) = match s.strip_suffix("++") {
            Some(mods) => (mods, "+"),
            None => match s.rsplit_once('+') {
                Some((mods, key)) if !key.is_empty() => (mods, key),
                _ => ("", s),
            },
        };
        let key = Key::parse(key_str)?;
        let modifiers = Modifiers::parse(mod_str);
        Some(Self { key, modifiers })
    }

    /// Folds letter case so shortcut lookups ignore it.
    fn folded(&self) -> KeyPress {
        match self.key {
            Key::Char(c) => KeyPress::new(Key::Char(c.to_ascii_lowercase()), self.modifiers),
            _ => self.clone(),
        }
    }
}

impl std::fmt::Display for KeyPress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.modifiers.is_empty() {
            write!(f, "{}", self.key)
        } else {
            write!(f, "{}+{}", self.modifiers, self.key)
        }
    }
}

/// A key binding maps a key press to a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    /// The key press.
    pub key: KeyPress,
    /// The command to execute.
    pub command: Command,
}

impl KeyBinding {
    pub fn new(key: KeyPress, command: Command) -> Self {
        Self { key, command }
    }
}

/// Keyboard shortcut table.
#[derive(Debug, Clone)]
pub struct Keymap {
    /// All key bindings, defaults first.
    bindings: Vec<KeyBinding>,
    /// Index by key press; the last binding for a key wins.
    by_key: HashMap<KeyPress, usize>,
}

impl Keymap {
    /// Creates a keymap with the default bindings on the given modifier.
    pub fn new(command_modifier: Modifiers) -> Self {
        let mut keymap = Self {
            bindings: Vec::new(),
            by_key: HashMap::new(),
        };
        keymap.add_default_bindings(command_modifier);
        keymap.rebuild_index();
        keymap
    }

    /// Creates a keymap from configuration.
    pub fn from_config(config: &Config) -> Self {
        let mut keymap = Self::new(config.keyboard.command_modifier.modifiers());

        // Add user bindings
        for (key_str, cmd_str) in &config.keyboard.bindings {
            match (KeyPress::parse(key_str), Command::parse(cmd_str)) {
                (Some(key), Some(command)) => {
                    keymap.bindings.push(KeyBinding::new(key.folded(), command));
                }
                _ => tracing::warn!("Ignoring key binding {} = {}", key_str, cmd_str),
            }
        }

        keymap.rebuild_index();
        keymap
    }

    /// Adds default key bindings.
    fn add_default_bindings(&mut self, modifier: Modifiers) {
        use Command::{ToggleBlock, ToggleMark};

        let defaults = [
            ('1', ToggleBlock(BlockFormat::H1)),
            ('2', ToggleBlock(BlockFormat::H2)),
            ('3', ToggleBlock(BlockFormat::H3)),
            ('p', ToggleBlock(BlockFormat::Callout)),
            ('q', ToggleBlock(BlockFormat::Quote)),
            ('b', ToggleMark(Mark::Bold)),
            ('i', ToggleMark(Mark::Italic)),
        ];

        for (c, command) in defaults {
            self.bindings
                .push(KeyBinding::new(KeyPress::new(Key::Char(c), modifier), command));
        }
    }

    /// Rebuilds the key index.
    fn rebuild_index(&mut self) {
        self.by_key.clear();
        for (i, binding) in self.bindings.iter().enumerate() {
            self.by_key.insert(binding.key.clone(), i);
        }
    }

    /// Looks up the command bound to a key press.
    pub fn lookup(&self, key: &KeyPress) -> Option<Command> {
        self.by_key
            .get(&key.folded())
            .map(|&i| self.bindings[i].command)
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::new(Modifiers::META)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CommandModifier;

    #[test]
    fn test_keypress_parse() {
        let kp = KeyPress::parse("meta+b").unwrap();
        assert_eq!(kp.key, Key::Char('b'));
        assert!(kp.modifiers.meta);

        let kp = KeyPress::parse("Shift+Enter").unwrap();
        assert_eq!(kp, KeyPress::new(Key::Enter, Modifiers::SHIFT));

        let kp = KeyPress::parse("ctrl++").unwrap();
        assert_eq!(kp, KeyPress::new(Key::Char('+'), Modifiers::CTRL));

        assert_eq!(KeyPress::parse("x"), Some(KeyPress::char('x')));
        assert_eq!(KeyPress::parse("nonsense"), None);
    }

    #[test]
    fn test_default_shortcuts() {
        let keymap = Keymap::default();
        assert_eq!(
            keymap.lookup(&KeyPress::new(Key::Char('1'), Modifiers::META)),
            Some(Command::ToggleBlock(BlockFormat::H1))
        );
        assert_eq!(
            keymap.lookup(&KeyPress::new(Key::Char('B'), Modifiers::META)),
            Some(Command::ToggleMark(Mark::Bold))
        );
        assert_eq!(
            keymap.lookup(&KeyPress::new(Key::Char('b'), Modifiers::CTRL)),
            None
        );
        assert_eq!(
            keymap.lookup(&KeyPress::new(Key::Char('z'), Modifiers::META)),
            None
        );
    }

    #[test]
    fn test_config_bindings_override_defaults() {
        let mut config = Config::default();
        config.keyboard.command_modifier = CommandModifier::Ctrl;
        config
            .keyboard
            .bindings
            .insert("ctrl+q".to_string(), "block.ordered-list".to_string());
        config
            .keyboard
            .bindings
            .insert("ctrl+x".to_string(), "not.a.command".to_string());

        let keymap = Keymap::from_config(&config);
        assert_eq!(
            keymap.lookup(&KeyPress::new(Key::Char('q'), Modifiers::CTRL)),
            Some(Command::ToggleBlock(BlockFormat::OrderedList))
        );
        assert_eq!(
            keymap.lookup(&KeyPress::new(Key::Char('i'), Modifiers::CTRL)),
            Some(Command::ToggleMark(Mark::Italic))
        );
        assert_eq!(
            keymap.lookup(&KeyPress::new(Key::Char('x'), Modifiers::CTRL)),
            None
        );
    }
}
