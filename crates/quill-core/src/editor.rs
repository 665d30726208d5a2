//! The editing session.
//!
//! ## Learning: The Facade Pattern
//!
//! `Editor` acts as a facade over the document, the binding state, the
//! dispatcher and the event bus. A host only calls `handle_key`, reads the
//! suggestions and listens for notifications; it never has to sequence
//! matcher, resolver and mutator calls itself.
//!
//! ## Thread Safety
//!
//! An `Editor` is owned by one thread and processes events strictly in
//! arrival order. The dataset is the only shared piece, read through
//! `Arc<dyn Dataset>`.

use std::sync::Arc;

use quill_doc::{Document, DocumentValue, InlineEntity, Marks, Point, Selection};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::binding::BindingState;
use crate::command::Command;
use crate::config::Config;
use crate::dataset::Dataset;
use crate::dispatcher::{self, Dispatcher, KeyOutcome, Route};
use crate::event::{EditorEvent, EventBus, Notification};
use crate::keymap::{Key, KeyPress};
use crate::mutator;
use crate::resolver::{Candidate, Resolver};
use crate::{CoreError, CoreResult};

/// Unique identifier for an editing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Creates a new unique session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One editing session over one document.
pub struct Editor {
    /// Session identifier carried by every notification
    id: SessionId,

    /// The document being edited
    document: Document,

    /// Cursor or selection
    selection: Selection,

    /// Matchers and highlighted candidate
    binding: BindingState,

    /// Marks for the next typed text, set by toggles on a collapsed selection
    pending_marks: Option<Marks>,

    /// Whether the session has focus
    focused: bool,

    /// Editor configuration
    config: Config,

    /// Key routing
    dispatcher: Dispatcher,

    /// Candidate scoring
    resolver: Resolver,

    /// Host records and pages
    dataset: Arc<dyn Dataset>,

    /// Event bus for notifications
    event_bus: EventBus,
}

impl Editor {
    /// Creates an editor over an empty document.
    pub fn new(dataset: Arc<dyn Dataset>) -> Self {
        Self::with_config(Config::default(), dataset)
    }

    /// Creates an editor with custom configuration.
    pub fn with_config(config: Config, dataset: Arc<dyn Dataset>) -> Self {
        let dispatcher = Dispatcher::new(&config);
        Self {
            id: SessionId::new(),
            document: Document::new(),
            selection: Selection::default(),
            binding: BindingState::idle(),
            pending_marks: None,
            focused: false,
            config,
            dispatcher,
            resolver: Resolver::new(),
            dataset,
            event_bus: EventBus::new(),
        }
    }

    /// Publishes notifications on a shared bus instead of a private one.
    pub fn with_event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = event_bus;
        self
    }

    /// Starts from a host value, with the cursor at the end.
    pub fn with_value(mut self, value: &DocumentValue) -> Self {
        self.set_value(value);
        self.selection = Selection::collapsed(self.document.end_point());
        self.rescan();
        self
    }

    // ==================== Accessors ====================

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn binding(&self) -> &BindingState {
        &self.binding
    }

    pub fn pending_marks(&self) -> Option<Marks> {
        self.pending_marks
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Subscribes to this session's notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.event_bus.subscribe()
    }

    /// Candidates to show, capped to the configured popup size.
    pub fn suggestions(&self) -> &[Candidate] {
        self.binding
            .visible(self.config.editor.suggestions.max_visible)
    }

    /// Index of the highlighted suggestion.
    pub fn active_index(&self) -> usize {
        self.binding.active_index()
    }

    // ==================== Value Exchange ====================

    /// The document in its exchanged form.
    pub fn value(&self) -> DocumentValue {
        self.document.to_value()
    }

    /// Replaces the whole document with a host value.
    ///
    /// The selection is pulled back inside the new document. No `Changed`
    /// notification is raised: the host already has this value.
    pub fn set_value(&mut self, value: &DocumentValue) {
        self.document = Document::from_value(value);
        self.selection = Selection::new(
            self.document.clamp(self.selection.anchor),
            self.document.clamp(self.selection.focus),
        );
        self.pending_marks = None;
        self.rescan();
    }

    // ==================== Input ====================

    /// Handles one key press.
    pub fn handle_key(&mut self, key: KeyPress) -> KeyOutcome {
        self.focused = true;
        let key = Dispatcher::normalize(key);
        let before_doc = self.document.clone();
        let before_selection = self.selection;

        let route = self
            .dispatcher
            .route(&key, &self.document, &self.selection, &self.binding);
        tracing::trace!(%key, ?route, "Dispatching key");

        let outcome = match route {
            Route::Navigate(direction) => {
                self.binding = self.binding.navigate(direction);
                return KeyOutcome::Handled;
            }
            Route::Advance => {
                self.emit(EditorEvent::Advance);
                return KeyOutcome::Handled;
            }
            Route::Commit => match self.commit() {
                Ok(_) => KeyOutcome::Handled,
                Err(err) => {
                    tracing::warn!("Commit failed: {}", err);
                    self.run_default(&key)
                }
            },
            Route::Lift => match mutator::lift_block(&mut self.document, self.selection.focus.block)
            {
                Ok(true) => KeyOutcome::Handled,
                Ok(false) => self.run_default(&key),
                Err(err) => {
                    tracing::warn!("Lift failed: {}", err);
                    self.run_default(&key)
                }
            },
            Route::Autoformat { range, autoformat } => {
                let applied = mutator::apply_autoformat(
                    &mut self.document,
                    &mut self.selection,
                    range,
                    &autoformat,
                    self.config.editor.reemit_dice_parens,
                );
                match applied {
                    Ok(_) => {
                        tracing::debug!(?autoformat, "Autoformat applied");
                        if autoformat.keeps_space() {
                            self.run_default(&key)
                        } else {
                            KeyOutcome::Handled
                        }
                    }
                    Err(err) => {
                        tracing::warn!("Autoformat failed: {}", err);
                        self.run_default(&key)
                    }
                }
            }
            Route::Command(command) => {
                if let Err(err) = self.execute(command) {
                    tracing::warn!("Command {} failed: {}", command, err);
                }
                KeyOutcome::Handled
            }
            Route::Default(key) => self.run_default(&key),
        };

        self.finish_edit(&before_doc, before_selection);
        if key.key == Key::Backspace && !before_doc.is_blank() && self.document.is_blank() {
            self.emit(EditorEvent::Deleted);
        }
        outcome
    }

    /// Types text one key at a time; `'\n'` presses Enter.
    pub fn type_text(&mut self, text: &str) {
        for c in text.chars() {
            let key = match c {
                '\n' => KeyPress::plain(Key::Enter),
                c => KeyPress::char(c),
            };
            self.handle_key(key);
        }
    }

    /// Inserts text at the selection in one step, bypassing key handling.
    pub fn insert_text(&mut self, text: &str) -> CoreResult<()> {
        let before_doc = self.document.clone();
        let before_selection = self.selection;
        dispatcher::insert_text(
            &mut self.document,
            &mut self.selection,
            &mut self.pending_marks,
            text,
        )?;
        self.finish_edit(&before_doc, before_selection);
        Ok(())
    }

    /// Moves the selection.
    pub fn select(&mut self, selection: Selection) -> CoreResult<()> {
        self.document.validate(selection.anchor)?;
        self.document.validate(selection.focus)?;
        if selection != self.selection {
            self.selection = selection;
            self.pending_marks = None;
            self.rescan();
        }
        Ok(())
    }

    /// Runs a formatting command on the selection.
    pub fn run_command(&mut self, command: Command) -> CoreResult<()> {
        let before_doc = self.document.clone();
        let before_selection = self.selection;
        self.execute(command)?;
        self.finish_edit(&before_doc, before_selection);
        Ok(())
    }

    /// Runs a command by id, such as `"block.h1"` or `"mark.bold"`.
    pub fn run_named_command(&mut self, id: &str) -> CoreResult<()> {
        let command =
            Command::parse(id).ok_or_else(|| CoreError::CommandNotFound(id.to_string()))?;
        self.run_command(command)
    }

    /// Gives the session focus.
    pub fn focus(&mut self) {
        self.focused = true;
    }

    /// Drops focus, clearing every matcher without committing.
    pub fn blur(&mut self) {
        self.focused = false;
        self.binding = self.binding.blur();
        self.emit(EditorEvent::Blurred);
    }

    /// Activates the entity right after a point (a click on it).
    ///
    /// Returns false if there is no entity there.
    pub fn activate_entity(&mut self, point: Point) -> bool {
        let event = match self.document.entity_at(point) {
            Some(InlineEntity::Record(record)) => EditorEvent::NavigateToRecord(record.id.clone()),
            Some(InlineEntity::Page(page)) => EditorEvent::NavigateToPage(page.key.clone()),
            Some(InlineEntity::Dice(dice)) => EditorEvent::RollDice(dice.expression.clone()),
            None => return false,
        };
        self.emit(event);
        true
    }

    // ==================== Internals ====================

    fn commit(&mut self) -> CoreResult<Point> {
        let (range, entity) = {
            let descriptor = self.binding.active().ok_or(CoreError::NoActiveMatch)?;
            let candidate = self.binding.highlighted().ok_or(CoreError::NoActiveMatch)?;
            (descriptor.range, candidate.entity.clone())
        };
        let at =
            mutator::insert_inline_entity(&mut self.document, &mut self.selection, range, entity)?;
        tracing::debug!(at = %at, "Committed candidate");
        self.binding = BindingState::idle();
        Ok(at)
    }

    fn execute(&mut self, command: Command) -> CoreResult<()> {
        match command {
            Command::ToggleBlock(format) => {
                mutator::toggle_block_type(&mut self.document, &self.selection, format)
            }
            Command::ToggleMark(mark) => mutator::toggle_format_mark(
                &mut self.document,
                &self.selection,
                &mut self.pending_marks,
                mark,
            ),
        }
    }

    fn run_default(&mut self, key: &KeyPress) -> KeyOutcome {
        if let Err(err) = dispatcher::default_action(
            &mut self.document,
            &mut self.selection,
            &mut self.pending_marks,
            key,
        ) {
            tracing::warn!("Default action for {} failed: {}", key, err);
        }
        KeyOutcome::PassThrough
    }

    /// Re-derives the binding state and notifies the host after an edit.
    fn finish_edit(&mut self, before_doc: &Document, before_selection: Selection) {
        let changed = self.document != *before_doc;
        if changed || self.selection != before_selection {
            self.rescan();
        }
        if changed {
            self.emit(EditorEvent::Changed(self.value()));
        }
    }

    fn rescan(&mut self) {
        self.binding = BindingState::rescan(
            &self.document,
            &self.selection,
            self.dataset.as_ref(),
            &mut self.resolver,
        );
    }

    fn emit(&self, event: EditorEvent) {
        self.event_bus.emit(Notification {
            session: self.id,
            event,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::InMemoryDataset;
    use crate::event::EventHandler;
    use crate::keymap::Modifiers;
    use crate::matcher::MatcherId;
    use quill_doc::{BlockKind, DiceRoll, ListKind, PageKey, RecordId};
    use std::sync::RwLock;

    fn dataset() -> Arc<InMemoryDataset> {
        Arc::new(
            InMemoryDataset::new()
                .with_record("r1", "Abbot")
                .with_record("r2", "Abacus")
                .with_record("r3", "Cabal")
                .with_record("r4", "Abyss")
                .with_record("r5", "Tabard")
                .with_record("r6", "Sabre")
                .with_page("p1", "Xanadu"),
        )
    }

    fn editor() -> (Editor, EventHandler) {
        let editor = Editor::new(dataset());
        let handler = EventHandler::new(editor.subscribe());
        (editor, handler)
    }

    fn events(handler: &mut EventHandler) -> Vec<EditorEvent> {
        handler.drain().into_iter().map(|n| n.event).collect()
    }

    fn press(editor: &mut Editor, key: Key) -> KeyOutcome {
        editor.handle_key(KeyPress::plain(key))
    }

    #[test]
    fn test_typing_reference_starts_matching() {
        let (mut editor, _) = editor();
        editor.type_text("@ab");

        let active = editor.binding().active().unwrap();
        assert_eq!(active.matcher, MatcherId::Record);
        assert!(!editor.suggestions().is_empty());
        assert_eq!(editor.active_index(), 0);
    }

    #[test]
    fn test_commit_inserts_highlighted_candidate() {
        let (mut editor, _) = editor();
        editor.type_text("hi @a");
        let candidates = editor.binding().active().unwrap().candidates.clone();
        assert!(candidates.len() >= 5);

        press(&mut editor, Key::Down);
        press(&mut editor, Key::Down);
        assert_eq!(editor.active_index(), 2);

        assert_eq!(press(&mut editor, Key::Enter), KeyOutcome::Handled);
        assert!(editor.binding().is_idle());
        assert_eq!(editor.document().len_blocks(), 1);
        assert_eq!(
            editor.document().entity_at(Point::new(0, 3)),
            Some(&candidates[2].entity)
        );
        assert_eq!(editor.selection(), Selection::collapsed(Point::new(0, 4)));
        assert_eq!(editor.document().plain_text(), "hi ");
    }

    #[test]
    fn test_navigation_clamps_at_last_candidate() {
        let (mut editor, _) = editor();
        editor.type_text("@a");
        let count = editor.binding().active().unwrap().candidates.len();
        for _ in 0..count + 2 {
            assert_eq!(press(&mut editor, Key::Down), KeyOutcome::Handled);
        }
        assert_eq!(editor.active_index(), count - 1);
        assert_eq!(editor.suggestions().len(), 5);
    }

    #[test]
    fn test_typing_resets_highlight() {
        let (mut editor, _) = editor();
        editor.type_text("@a");
        press(&mut editor, Key::Down);
        editor.type_text("b");
        assert_eq!(editor.active_index(), 0);
    }

    #[test]
    fn test_enter_without_match_splits_block() {
        let (mut editor, _) = editor();
        editor.type_text("one");
        assert_eq!(press(&mut editor, Key::Enter), KeyOutcome::PassThrough);
        assert_eq!(editor.document().len_blocks(), 2);
    }

    #[test]
    fn test_shift_enter_advances() {
        let (mut editor, mut handler) = editor();
        editor.type_text("x");
        events(&mut handler);

        let outcome = editor.handle_key(KeyPress::new(Key::Enter, Modifiers::SHIFT));
        assert_eq!(outcome, KeyOutcome::Handled);
        assert_eq!(events(&mut handler), vec![EditorEvent::Advance]);
        assert_eq!(editor.document().len_blocks(), 1);
    }

    #[test]
    fn test_dice_autoformat() {
        let (mut editor, _) = editor();
        editor.type_text("2d6 ");

        let doc = editor.document();
        assert_eq!(
            doc.entity_at(Point::ZERO),
            Some(&InlineEntity::Dice(DiceRoll::new("2d6")))
        );
        assert_eq!(doc.plain_text(), " ");
        assert_eq!(editor.selection().focus, Point::new(0, 2));
    }

    #[test]
    fn test_parenthesized_dice_keeps_closing_paren() {
        let (mut editor, _) = editor();
        editor.type_text("(3d8+2) ");

        let doc = editor.document();
        assert_eq!(
            doc.entity_at(Point::ZERO),
            Some(&InlineEntity::Dice(DiceRoll::new("3d8+2")))
        );
        assert_eq!(doc.plain_text(), ") ");
    }

    #[test]
    fn test_dice_with_repeated_open_parens() {
        let (mut editor, _) = editor();
        editor.type_text("((2d6) ");

        let doc = editor.document();
        assert_eq!(
            doc.entity_at(Point::ZERO),
            Some(&InlineEntity::Dice(DiceRoll::new("2d6")))
        );
        assert_eq!(doc.plain_text(), ") ");
    }

    #[test]
    fn test_reemit_dice_parens_is_opt_in() {
        let mut config = Config::default();
        config.editor.reemit_dice_parens = true;
        let mut editor = Editor::with_config(config, dataset());
        editor.type_text("(3d8+2) ");

        let doc = editor.document();
        assert_eq!(
            doc.entity_at(Point::new(0, 1)),
            Some(&InlineEntity::Dice(DiceRoll::new("3d8+2")))
        );
        assert_eq!(doc.plain_text(), "() ");
    }

    #[test]
    fn test_list_markers() {
        for (marker, list) in [
            ("1. ", ListKind::Ordered),
            ("* ", ListKind::Unordered),
            ("- ", ListKind::Unordered),
        ] {
            let (mut editor, _) = editor();
            editor.type_text(marker);
            let block = editor.document().block(0).unwrap();
            assert_eq!(block.list, Some(list), "marker {marker:?}");
            assert_eq!(block.kind, BlockKind::ListItem);
            assert!(block.is_empty());
        }
    }

    #[test]
    fn test_shift_eight_starts_list() {
        let (mut editor, _) = editor();
        editor.handle_key(KeyPress::new(Key::Char('8'), Modifiers::SHIFT));
        press(&mut editor, Key::Space);
        assert_eq!(
            editor.document().block(0).unwrap().list,
            Some(ListKind::Unordered)
        );
    }

    #[test]
    fn test_heading_shortcut() {
        let (mut editor, _) = editor();
        editor.type_text("## Title");
        let block = editor.document().block(0).unwrap();
        assert_eq!(block.kind, BlockKind::Heading2);
        assert_eq!(block.plain_text(), "Title");
    }

    #[test]
    fn test_backspace_lifts_then_deletes() {
        let (mut editor, mut handler) = editor();
        editor.type_text("first\n- ");
        assert_eq!(
            editor.document().block(1).unwrap().list,
            Some(ListKind::Unordered)
        );
        events(&mut handler);

        assert_eq!(press(&mut editor, Key::Backspace), KeyOutcome::Handled);
        let block = editor.document().block(1).unwrap();
        assert_eq!(block.list, None);
        assert_eq!(block.kind, BlockKind::Paragraph);
        assert_eq!(editor.document().len_blocks(), 2);

        assert_eq!(press(&mut editor, Key::Backspace), KeyOutcome::PassThrough);
        assert_eq!(editor.document().len_blocks(), 1);
        assert_eq!(editor.selection().focus, Point::new(0, 5));
        assert!(!events(&mut handler).contains(&EditorEvent::Deleted));
    }

    #[test]
    fn test_deleting_everything_raises_one_deletion() {
        let (mut editor, mut handler) = editor();
        editor.type_text("ab");
        events(&mut handler);

        press(&mut editor, Key::Backspace);
        press(&mut editor, Key::Backspace);
        press(&mut editor, Key::Backspace);

        let deleted = events(&mut handler)
            .into_iter()
            .filter(|e| *e == EditorEvent::Deleted)
            .count();
        assert_eq!(deleted, 1);
    }

    #[test]
    fn test_changed_only_when_value_changes() {
        let (mut editor, mut handler) = editor();
        editor.type_text("a");
        assert!(matches!(
            events(&mut handler).as_slice(),
            [EditorEvent::Changed(_)]
        ));

        press(&mut editor, Key::Left);
        press(&mut editor, Key::Escape);
        assert!(events(&mut handler).is_empty());
    }

    #[test]
    fn test_blur_clears_without_commit() {
        let (mut editor, mut handler) = editor();
        editor.type_text("@ab");
        let before = editor.document().clone();
        events(&mut handler);

        editor.blur();
        assert!(editor.binding().is_idle());
        assert_eq!(editor.document(), &before);
        assert_eq!(events(&mut handler), vec![EditorEvent::Blurred]);

        // Enter after blur is ordinary
        assert_eq!(press(&mut editor, Key::Enter), KeyOutcome::PassThrough);
    }

    #[test]
    fn test_pending_bold_applies_to_typed_text() {
        let (mut editor, _) = editor();
        editor.type_text("a");
        editor.handle_key(KeyPress::new(Key::Char('b'), Modifiers::META));
        assert_eq!(editor.pending_marks().map(|m| m.bold), Some(true));

        editor.type_text("b");
        assert!(!editor.document().marks_at(Point::new(0, 1)).bold);
        assert!(editor.document().marks_at(Point::new(0, 2)).bold);
        assert!(editor.pending_marks().is_none());
    }

    #[test]
    fn test_meta_shortcuts_toggle_blocks() {
        let (mut editor, _) = editor();
        editor.type_text("title");
        editor.handle_key(KeyPress::new(Key::Char('1'), Modifiers::META));
        assert_eq!(editor.document().block(0).unwrap().kind, BlockKind::Heading1);

        editor.handle_key(KeyPress::new(Key::Char('p'), Modifiers::META));
        assert_eq!(editor.document().block(0).unwrap().kind, BlockKind::Callout);

        let outcome = editor.handle_key(KeyPress::new(Key::Char('k'), Modifiers::META));
        assert_eq!(outcome, KeyOutcome::PassThrough);
        assert_eq!(editor.document().plain_text(), "title");
    }

    #[test]
    fn test_named_command_over_selection() {
        let (mut editor, _) = editor();
        editor.type_text("one\ntwo");
        editor
            .select(Selection::new(Point::new(0, 1), Point::new(1, 1)))
            .unwrap();
        editor.run_named_command("block.list").unwrap();

        let doc = editor.document();
        assert_eq!(doc.block(0).unwrap().list, Some(ListKind::Unordered));
        assert_eq!(doc.block(1).unwrap().list, Some(ListKind::Unordered));
        assert!(matches!(
            editor.run_named_command("block.h9"),
            Err(CoreError::CommandNotFound(_))
        ));
    }

    #[test]
    fn test_activate_entity() {
        let (mut editor, mut handler) = editor();
        editor.type_text("@abb");
        press(&mut editor, Key::Enter);
        editor.type_text(" #xan");
        press(&mut editor, Key::Enter);
        editor.type_text(" d20 ");
        events(&mut handler);

        assert!(editor.activate_entity(Point::new(0, 0)));
        assert!(editor.activate_entity(Point::new(0, 2)));
        assert!(editor.activate_entity(Point::new(0, 4)));
        assert!(!editor.activate_entity(Point::new(0, 1)));

        assert_eq!(
            events(&mut handler),
            vec![
                EditorEvent::NavigateToRecord(RecordId::new("r1")),
                EditorEvent::NavigateToPage(PageKey::new("p1")),
                EditorEvent::RollDice("d20".to_string()),
            ]
        );
    }

    #[test]
    fn test_set_value_normalizes_and_clamps() {
        let (mut editor, mut handler) = editor();
        editor.type_text("a long line of text");
        events(&mut handler);

        editor.set_value(&DocumentValue::from_text("short"));
        assert_eq!(editor.selection().focus, Point::new(0, 5));
        assert!(events(&mut handler).is_empty());
        assert_eq!(editor.value(), DocumentValue::from_text("short"));
    }

    #[test]
    fn test_dataset_changes_are_seen_on_next_scan() {
        let shared = Arc::new(RwLock::new(InMemoryDataset::new()));
        let mut editor = Editor::new(shared.clone());
        editor.type_text("@gob");
        assert!(editor.binding().is_idle());

        shared.write().unwrap().insert_record("g1", "Goblin");
        editor.type_text("l");
        assert_eq!(editor.suggestions()[0].label, "Goblin");
    }
}
