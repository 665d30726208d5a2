//! Keyboard dispatch.
//!
//! Every key press goes through [`Dispatcher::route`], which decides *what*
//! should happen without touching anything. The first applicable rule
//! wins:
//!
//! 1. Up/Down while a matcher is active: move the highlight
//! 2. Shift+Enter: advance to the next field
//! 3. Enter while a matcher is active: commit the highlighted candidate
//! 4. Backspace at the start of a formatted block: lift the block
//! 5. Space after a dice token, list marker or heading marker: autoformat
//! 6. Command modifier + key: run the bound formatting command
//!
//! Anything else falls to [`default_action`], the kernel's ordinary
//! editing behavior. Shift+8 is rewritten to a plain `*` before routing so
//! that `* ` works on every keyboard layout.
//!
//! ## Learning: Separating Decision From Effect
//!
//! `route` is a pure function of the key and the current state, so the
//! priority order can be tested by inspecting the returned [`Route`]
//! without building an editor.

use quill_doc::{Document, Marks, Point, Range, Selection, Unit};

use crate::binding::{BindingState, Navigate};
use crate::command::Command;
use crate::config::{AutoformatConfig, Config};
use crate::keymap::{Key, KeyPress, Keymap, Modifiers};
use crate::matcher::{self, Autoformat};
use crate::mutator;
use crate::CoreResult;

/// Whether the editor consumed a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The key was intercepted; its default behavior did not run
    Handled,
    /// The key's default editing behavior ran
    PassThrough,
}

/// What a key press should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Move the suggestion highlight
    Navigate(Navigate),
    /// Raise the advance notification
    Advance,
    /// Commit the highlighted candidate
    Commit,
    /// Lift the current block out of its formatting
    Lift,
    /// Replace the token before the cursor
    Autoformat {
        range: Range,
        autoformat: Autoformat,
    },
    /// Run a formatting command
    Command(Command),
    /// Ordinary editing
    Default(KeyPress),
}

/// Routes key presses by priority.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    keymap: Keymap,
    command_modifier: Modifiers,
    autoformat: AutoformatConfig,
}

impl Dispatcher {
    /// Creates a dispatcher from configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            keymap: Keymap::from_config(config),
            command_modifier: config.keyboard.command_modifier.modifiers(),
            autoformat: config.editor.autoformat,
        }
    }

    /// Rewrites layout-dependent key presses.
    ///
    /// Shift+8 becomes `*`, and a typed `' '` becomes [`Key::Space`].
    pub fn normalize(key: KeyPress) -> KeyPress {
        match key.key {
            Key::Char('8') if key.modifiers == Modifiers::SHIFT => KeyPress::char('*'),
            Key::Char(' ') => KeyPress::new(Key::Space, key.modifiers),
            _ => key,
        }
    }

    /// Decides what a (normalized) key press does.
    pub fn route(
        &self,
        key: &KeyPress,
        doc: &Document,
        selection: &Selection,
        binding: &BindingState,
    ) -> Route {
        let mods = key.modifiers;
        match key.key {
            Key::Up if !binding.is_idle() => return Route::Navigate(Navigate::Up),
            Key::Down if !binding.is_idle() => return Route::Navigate(Navigate::Down),
            Key::Enter if mods.shift => return Route::Advance,
            Key::Enter if !mods.has_command() && !binding.is_idle() => return Route::Commit,
            Key::Backspace if mods.is_empty() && self.at_liftable_start(doc, selection) => {
                return Route::Lift;
            }
            Key::Space if mods.is_empty() => {
                if let Some(route) = self.autoformat_route(doc, selection) {
                    return route;
                }
            }
            _ => {}
        }

        if !mods.is_empty() && mods.contains(self.command_modifier) {
            if let Some(command) = self.keymap.lookup(key) {
                return Route::Command(command);
            }
        }

        Route::Default(key.clone())
    }

    fn at_liftable_start(&self, doc: &Document, selection: &Selection) -> bool {
        selection.is_collapsed()
            && selection.focus.is_block_start()
            && mutator::can_lift(doc, selection.focus.block)
    }

    fn autoformat_route(&self, doc: &Document, selection: &Selection) -> Option<Route> {
        if !selection.is_collapsed() {
            return None;
        }
        let token = doc.token_before(selection.focus)?;
        let autoformat = matcher::classify_on_space(&token, &self.autoformat)?;
        Some(Route::Autoformat {
            range: token.range,
            autoformat,
        })
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

// ==================== Default Editing ====================

/// Types text over the selection, applying and clearing pending marks.
pub fn insert_text(
    doc: &mut Document,
    selection: &mut Selection,
    pending: &mut Option<Marks>,
    text: &str,
) -> CoreResult<Point> {
    let range = selection.range();
    let marks = *pending;
    let at = doc.transaction(|draft| {
        let at = draft.delete_range(range)?;
        draft.insert_text(at, text, marks)
    })?;
    *pending = None;
    selection.collapse_to(at);
    Ok(at)
}

/// The kernel's ordinary behavior for a key press.
///
/// Characters are typed, Enter splits the block, Backspace/Delete remove a
/// character (a word with Alt) or the selection, arrows move the cursor
/// (extending with Shift, by word with Alt), Home/End jump within the
/// block. Keys with Ctrl or Meta never type.
pub fn default_action(
    doc: &mut Document,
    selection: &mut Selection,
    pending: &mut Option<Marks>,
    key: &KeyPress,
) -> CoreResult<()> {
    let mods = key.modifiers;
    let unit = if mods.alt { Unit::Word } else { Unit::Character };

    match key.key {
        Key::Char(c) if !mods.has_command() => {
            let mut buf = [0u8; 4];
            insert_text(doc, selection, pending, c.encode_utf8(&mut buf))?;
        }
        Key::Space if !mods.has_command() => {
            insert_text(doc, selection, pending, " ")?;
        }
        Key::Enter if !mods.has_command() => {
            let range = selection.range();
            let at = doc.transaction(|draft| {
                let at = draft.delete_range(range)?;
                draft.split_block(at)
            })?;
            selection.collapse_to(at);
        }
        Key::Backspace | Key::Delete => {
            let at = if !selection.is_collapsed() {
                doc.delete_range(selection.range())?
            } else if key.key == Key::Backspace {
                doc.delete_backward(selection.focus, unit)?
            } else {
                doc.delete_forward(selection.focus, unit)?
            };
            selection.collapse_to(at);
        }
        Key::Left | Key::Right | Key::Up | Key::Down | Key::Home | Key::End => {
            move_selection(doc, selection, key, unit);
            *pending = None;
        }
        _ => {}
    }
    Ok(())
}

fn move_selection(doc: &Document, selection: &mut Selection, key: &KeyPress, unit: Unit) {
    let extend = key.modifiers.shift;
    let focus = doc.clamp(selection.focus);

    // Without Shift, Left/Right first collapse an expanded selection.
    if !extend && !selection.is_collapsed() {
        match key.key {
            Key::Left => return selection.collapse_to(selection.start()),
            Key::Right => return selection.collapse_to(selection.end()),
            _ => {}
        }
    }

    let target = match key.key {
        Key::Left => doc.before(focus, unit).unwrap_or(focus),
        Key::Right => doc.after(focus, unit).unwrap_or(focus),
        Key::Up => match focus.block.checked_sub(1) {
            Some(block) => doc.clamp(Point::new(block, focus.offset)),
            None => Point::ZERO,
        },
        Key::Down if focus.block + 1 < doc.len_blocks() => {
            doc.clamp(Point::new(focus.block + 1, focus.offset))
        }
        Key::Down => doc.end_point(),
        Key::Home => focus.with_offset(0),
        Key::End => doc.clamp(focus.with_offset(usize::MAX)),
        _ => focus,
    };

    if extend {
        selection.extend_to(target);
    } else {
        selection.collapse_to(target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::InMemoryDataset;
    use crate::mutator::BlockFormat;
    use crate::resolver::Resolver;
    use quill_doc::{Block, BlockKind, ListKind, Mark};

    fn matching(doc: &Document, selection: &Selection) -> BindingState {
        let dataset = InMemoryDataset::new()
            .with_record("r1", "Abbot")
            .with_record("r2", "Abyss");
        BindingState::rescan(doc, selection, &dataset, &mut Resolver::new())
    }

    fn at_end(doc: &Document) -> Selection {
        Selection::collapsed(doc.end_point())
    }

    #[test]
    fn test_arrows_navigate_only_while_matching() {
        let dispatcher = Dispatcher::default();
        let doc = Document::from("@ab");
        let selection = at_end(&doc);
        let binding = matching(&doc, &selection);
        let down = KeyPress::plain(Key::Down);

        assert_eq!(
            dispatcher.route(&down, &doc, &selection, &binding),
            Route::Navigate(Navigate::Down)
        );
        assert_eq!(
            dispatcher.route(&down, &doc, &selection, &BindingState::idle()),
            Route::Default(down.clone())
        );
    }

    #[test]
    fn test_enter_routes() {
        let dispatcher = Dispatcher::default();
        let doc = Document::from("@ab");
        let selection = at_end(&doc);
        let binding = matching(&doc, &selection);

        let enter = KeyPress::plain(Key::Enter);
        let shift_enter = KeyPress::new(Key::Enter, Modifiers::SHIFT);
        assert_eq!(dispatcher.route(&enter, &doc, &selection, &binding), Route::Commit);
        assert_eq!(
            dispatcher.route(&shift_enter, &doc, &selection, &binding),
            Route::Advance
        );
        assert_eq!(
            dispatcher.route(&enter, &doc, &selection, &BindingState::idle()),
            Route::Default(enter.clone())
        );
    }

    #[test]
    fn test_backspace_lifts_only_formatted_block_start() {
        let dispatcher = Dispatcher::default();
        let backspace = KeyPress::plain(Key::Backspace);
        let idle = BindingState::idle();

        let list = Document::from_blocks(vec![Block::list_item(ListKind::Unordered, "x")]);
        let start = Selection::collapsed(Point::ZERO);
        assert_eq!(dispatcher.route(&backspace, &list, &start, &idle), Route::Lift);

        let inside = Selection::collapsed(Point::new(0, 1));
        assert_eq!(
            dispatcher.route(&backspace, &list, &inside, &idle),
            Route::Default(backspace.clone())
        );

        let plain = Document::from("x");
        assert_eq!(
            dispatcher.route(&backspace, &plain, &start, &idle),
            Route::Default(backspace.clone())
        );
    }

    #[test]
    fn test_space_autoformats() {
        let dispatcher = Dispatcher::default();
        let space = KeyPress::plain(Key::Space);
        let idle = BindingState::idle();

        let doc = Document::from("roll 2d6");
        let route = dispatcher.route(&space, &doc, &at_end(&doc), &idle);
        assert!(matches!(
            route,
            Route::Autoformat { autoformat: Autoformat::Dice(ref dice), range }
                if dice.expression == "2d6" && range.start == Point::new(0, 5)
        ));

        let doc = Document::from("-");
        assert!(matches!(
            dispatcher.route(&space, &doc, &at_end(&doc), &idle),
            Route::Autoformat { autoformat: Autoformat::List(ListKind::Unordered), .. }
        ));

        let doc = Document::from("hello");
        assert_eq!(
            dispatcher.route(&space, &doc, &at_end(&doc), &idle),
            Route::Default(space.clone())
        );
    }

    #[test]
    fn test_shift_eight_becomes_star() {
        let key = Dispatcher::normalize(KeyPress::new(Key::Char('8'), Modifiers::SHIFT));
        assert_eq!(key, KeyPress::char('*'));
        assert_eq!(
            Dispatcher::normalize(KeyPress::char(' ')),
            KeyPress::plain(Key::Space)
        );
    }

    #[test]
    fn test_command_shortcuts() {
        let dispatcher = Dispatcher::default();
        let doc = Document::from("x");
        let selection = at_end(&doc);
        let idle = BindingState::idle();

        let meta_q = KeyPress::new(Key::Char('q'), Modifiers::META);
        assert_eq!(
            dispatcher.route(&meta_q, &doc, &selection, &idle),
            Route::Command(Command::ToggleBlock(BlockFormat::Quote))
        );
        let meta_i = KeyPress::new(Key::Char('i'), Modifiers::META);
        assert_eq!(
            dispatcher.route(&meta_i, &doc, &selection, &idle),
            Route::Command(Command::ToggleMark(Mark::Italic))
        );
        let meta_z = KeyPress::new(Key::Char('z'), Modifiers::META);
        assert_eq!(
            dispatcher.route(&meta_z, &doc, &selection, &idle),
            Route::Default(meta_z.clone())
        );
    }

    #[test]
    fn test_default_typing_and_pending_marks() {
        let mut doc = Document::new();
        let mut selection = Selection::default();
        let mut pending = Some(Marks::NONE.with(Mark::Bold, true));

        default_action(&mut doc, &mut selection, &mut pending, &KeyPress::char('a')).unwrap();
        assert!(doc.marks_at(Point::new(0, 1)).bold);
        assert!(pending.is_none());

        let meta_a = KeyPress::new(Key::Char('a'), Modifiers::META);
        default_action(&mut doc, &mut selection, &mut pending, &meta_a).unwrap();
        assert_eq!(doc.plain_text(), "a");
    }

    #[test]
    fn test_default_enter_and_backspace() {
        let mut doc = Document::from("ab");
        doc.set_block_kind(0, BlockKind::Quote).unwrap();
        let mut selection = Selection::collapsed(Point::new(0, 1));
        let mut pending = None;

        default_action(&mut doc, &mut selection, &mut pending, &KeyPress::plain(Key::Enter))
            .unwrap();
        assert_eq!(doc.plain_text(), "a\nb");
        assert_eq!(selection.focus, Point::new(1, 0));
        assert_eq!(doc.block(1).unwrap().kind, BlockKind::Quote);

        default_action(
            &mut doc,
            &mut selection,
            &mut pending,
            &KeyPress::plain(Key::Backspace),
        )
        .unwrap();
        assert_eq!(doc.plain_text(), "ab");
        assert_eq!(selection.focus, Point::new(0, 1));
    }

    #[test]
    fn test_default_movement() {
        let doc_text = "one two\nx";
        let mut doc = Document::from(doc_text);
        let mut selection = Selection::collapsed(Point::new(0, 7));
        let mut pending = None;

        let alt_left = KeyPress::new(Key::Left, Modifiers::ALT);
        default_action(&mut doc, &mut selection, &mut pending, &alt_left).unwrap();
        assert_eq!(selection.focus, Point::new(0, 4));

        let shift_home = KeyPress::new(Key::Home, Modifiers::SHIFT);
        default_action(&mut doc, &mut selection, &mut pending, &shift_home).unwrap();
        assert_eq!(selection.range(), Range::new(Point::new(0, 0), Point::new(0, 4)));

        default_action(&mut doc, &mut selection, &mut pending, &KeyPress::plain(Key::Down))
            .unwrap();
        assert_eq!(selection.focus, Point::new(1, 0));

        default_action(&mut doc, &mut selection, &mut pending, &KeyPress::plain(Key::End))
            .unwrap();
        assert_eq!(selection.focus, Point::new(1, 1));
        assert_eq!(doc.plain_text(), doc_text);
    }
}
