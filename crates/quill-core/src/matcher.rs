//! Pattern matchers over the token before the cursor.
//!
//! Two families:
//! - *continuous* matchers (`@record`, `#page`) re-evaluated after every
//!   change, feeding the binding state
//! - *autoformat* matchers (dice, list markers, heading shortcuts)
//!   evaluated only when Space is pressed
//!
//! Every matcher anchors its pattern on both ends, so a token only matches
//! when the *whole* word before the cursor has the right shape. Nothing in
//! this module fails: malformed text simply does not match.

use std::sync::LazyLock;

use quill_doc::{BlockKind, ListKind, Token};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::AutoformatConfig;

// Grammar: @ followed by one or more alphanumerics
static RECORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^@([a-zA-Z0-9]+)$").unwrap());

// Grammar: # followed by one or more alphanumerics
static PAGE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^#([a-zA-Z0-9]+)$").unwrap());

// Grammar: (* count? d|D sides (+|- modifier)? )?
static DICE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<open>\(*)(?P<dice>\d*[dD]\d+(?:[+-]\d+)?)(?P<close>\))?$").unwrap()
});

/// The continuous matchers, in declaration order.
///
/// Declaration order is also tie-break order: when more than one matcher
/// has candidates, the earlier one governs Enter and the arrow keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatcherId {
    Record,
    Page,
}

impl MatcherId {
    /// Every continuous matcher, in declaration order.
    pub const ALL: [MatcherId; 2] = [MatcherId::Record, MatcherId::Page];

    /// The sigil that starts a reference.
    pub fn sigil(&self) -> char {
        match self {
            MatcherId::Record => '@',
            MatcherId::Page => '#',
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatcherId::Record => "record",
            MatcherId::Page => "page",
        }
    }

    fn regex(&self) -> &'static Regex {
        match self {
            MatcherId::Record => &RECORD_REGEX,
            MatcherId::Page => &PAGE_REGEX,
        }
    }

    /// Extracts the query from a token, if the whole token matches.
    ///
    /// ```
    /// use quill_core::MatcherId;
    ///
    /// assert_eq!(MatcherId::Record.extract("@gob"), Some("gob"));
    /// assert_eq!(MatcherId::Record.extract("mail@gob"), None);
    /// assert_eq!(MatcherId::Page.extract("@gob"), None);
    /// ```
    pub fn extract<'a>(&self, token: &'a str) -> Option<&'a str> {
        self.regex()
            .captures(token)
            .and_then(|caps| caps.get(1))
            .map(|query| query.as_str())
    }
}

impl std::fmt::Display for MatcherId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dice expression found before the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiceMatch {
    /// The notation without parentheses, e.g. `3d8+2`
    pub expression: String,
    /// How many `(` the token started with
    pub open_parens: usize,
    /// The token ended with `)`
    pub close_paren: bool,
}

/// Matches a dice token such as `2d6`, `d20` or `(3d8+2)`.
pub fn match_dice(token: &str) -> Option<DiceMatch> {
    let caps = DICE_REGEX.captures(token)?;
    Some(DiceMatch {
        expression: caps.name("dice")?.as_str().to_string(),
        open_parens: caps.name("open").map_or(0, |open| open.as_str().len()),
        close_paren: caps.name("close").is_some(),
    })
}

/// Matches a list marker: `1.` for ordered, `*` or `-` for unordered.
pub fn match_list_marker(text: &str) -> Option<ListKind> {
    match text {
        "1." => Some(ListKind::Ordered),
        "*" | "-" => Some(ListKind::Unordered),
        _ => None,
    }
}

/// Matches a heading shortcut: one to three `#`.
pub fn match_heading(text: &str) -> Option<BlockKind> {
    if text.is_empty() || !text.chars().all(|c| c == '#') {
        return None;
    }
    BlockKind::heading(text.len())
}

/// A structural change triggered by Space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Autoformat {
    /// Replace the token with a dice roller
    Dice(DiceMatch),
    /// Erase the marker and make the block a list item
    List(ListKind),
    /// Erase the marker and make the block a heading
    Heading(BlockKind),
}

impl Autoformat {
    /// Returns true if the Space that triggered this should still be typed.
    pub fn keeps_space(&self) -> bool {
        matches!(self, Autoformat::Dice(_))
    }
}

/// Classifies the token before the cursor when Space is pressed.
///
/// Block markers only fire when the token is the whole text before the
/// cursor; dice fire on any token.
pub fn classify_on_space(token: &Token, options: &AutoformatConfig) -> Option<Autoformat> {
    if token.starts_block() {
        if options.lists {
            if let Some(list) = match_list_marker(&token.text) {
                return Some(Autoformat::List(list));
            }
        }
        if options.headings {
            if let Some(kind) = match_heading(&token.text) {
                return Some(Autoformat::Heading(kind));
            }
        }
    }
    if options.dice {
        return match_dice(&token.text).map(Autoformat::Dice);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_doc::{Point, Range};

    fn token(text: &str, start: usize) -> Token {
        Token {
            text: text.to_string(),
            range: Range::new(
                Point::new(0, start),
                Point::new(0, start + text.chars().count()),
            ),
        }
    }

    #[test]
    fn test_reference_matchers_are_exclusive() {
        assert_eq!(MatcherId::Record.extract("@abc"), Some("abc"));
        assert_eq!(MatcherId::Page.extract("@abc"), None);
        assert_eq!(MatcherId::Page.extract("#xyz"), Some("xyz"));
        assert_eq!(MatcherId::Record.extract("#xyz"), None);
    }

    #[test]
    fn test_reference_requires_whole_token() {
        assert_eq!(MatcherId::Record.extract("@"), None);
        assert_eq!(MatcherId::Record.extract("@ab-c"), None);
        assert_eq!(MatcherId::Record.extract("x@abc"), None);
        assert_eq!(MatcherId::Record.extract("@@abc"), None);
    }

    #[test]
    fn test_dice_shapes() {
        let plain = match_dice("2d6").unwrap();
        assert_eq!(plain.expression, "2d6");
        assert!(plain.open_parens == 0 && !plain.close_paren);

        let wrapped = match_dice("(3d8+2)").unwrap();
        assert_eq!(wrapped.expression, "3d8+2");
        assert!(wrapped.open_parens == 1 && wrapped.close_paren);

        assert_eq!(match_dice("D20").unwrap().expression, "D20");
        assert_eq!(match_dice("d4-1)").unwrap().expression, "d4-1");

        let nested = match_dice("((2d6)").unwrap();
        assert_eq!(nested.expression, "2d6");
        assert_eq!(nested.open_parens, 2);
        assert!(nested.close_paren);
    }

    #[test]
    fn test_dice_rejects_malformed() {
        for text in ["d", "2d", "2x6", "2d6+", "dd6", "2d6++1", "word"] {
            assert!(match_dice(text).is_none(), "{text} should not match");
        }
    }

    #[test]
    fn test_block_markers() {
        assert_eq!(match_list_marker("1."), Some(ListKind::Ordered));
        assert_eq!(match_list_marker("*"), Some(ListKind::Unordered));
        assert_eq!(match_list_marker("-"), Some(ListKind::Unordered));
        assert_eq!(match_list_marker("2."), None);
        assert_eq!(match_heading("##"), Some(BlockKind::Heading2));
        assert_eq!(match_heading("####"), None);
        assert_eq!(match_heading("#a"), None);
    }

    #[test]
    fn test_classify_requires_block_start_for_markers() {
        let options = AutoformatConfig::default();
        assert_eq!(
            classify_on_space(&token("1.", 0), &options),
            Some(Autoformat::List(ListKind::Ordered))
        );
        assert_eq!(classify_on_space(&token("1.", 4), &options), None);
        assert!(matches!(
            classify_on_space(&token("2d6", 4), &options),
            Some(Autoformat::Dice(_))
        ));
    }

    #[test]
    fn test_classify_respects_disabled_families() {
        let options = AutoformatConfig {
            dice: false,
            lists: true,
            headings: false,
        };
        assert_eq!(classify_on_space(&token("d6", 0), &options), None);
        assert_eq!(classify_on_space(&token("#", 0), &options), None);
        assert!(classify_on_space(&token("-", 0), &options).is_some());
    }
}
