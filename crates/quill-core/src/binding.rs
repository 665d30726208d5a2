//! The inline binding state machine.
//!
//! ## Learning: State as a Value
//!
//! Instead of scattering "current candidates", "highlighted index" and
//! "target range" across mutable fields, the whole state is one value.
//! Every transition takes the current value and returns the next one, so
//! a transition can be tested without an editor:
//!
//! ```text
//!            rescan (a matcher has candidates)
//!   Idle ───────────────────────────────────────> Matching
//!    ^                                              │  │
//!    │   rescan (nothing matches) / commit / blur   │  │ navigate
//!    └──────────────────────────────────────────────┘  └──> Matching
//! ```
//!
//! Each continuous matcher keeps its own descriptor. The *active* one is the
//! first in declaration order with a non-empty candidate list; it governs
//! Enter and the arrow keys.

use std::collections::BTreeMap;

use quill_doc::{Document, Range, Selection};

use crate::dataset::Dataset;
use crate::matcher::MatcherId;
use crate::resolver::{Candidate, Resolver};

/// What one matcher found before the cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchDescriptor {
    /// The matcher that produced this descriptor
    pub matcher: MatcherId,
    /// The extracted query, without the sigil
    pub query: String,
    /// The text a commit would replace (sigil included)
    pub range: Range,
    /// Scored candidates, best first; never empty
    pub candidates: Vec<Candidate>,
}

/// Direction of a suggestion-list move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigate {
    Up,
    Down,
}

/// Binding state between two events.
///
/// `Idle` when no matcher has candidates, `Matching` otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingState {
    matches: BTreeMap<MatcherId, MatchDescriptor>,
    active_index: usize,
}

impl BindingState {
    /// The idle state.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Recomputes the state from the text before the cursor.
    ///
    /// Only a collapsed selection can match. The highlighted index always
    /// starts at 0. Recomputing against the same document, selection and
    /// dataset yields an equal state.
    pub fn rescan(
        doc: &Document,
        selection: &Selection,
        dataset: &dyn Dataset,
        resolver: &mut Resolver,
    ) -> Self {
        if !selection.is_collapsed() {
            return Self::idle();
        }
        let Some(token) = doc.token_before(selection.focus) else {
            return Self::idle();
        };

        let mut matches = BTreeMap::new();
        for matcher in MatcherId::ALL {
            let Some(query) = matcher.extract(&token.text) else {
                continue;
            };
            let candidates = resolver.resolve_for(matcher, query, dataset);
            if candidates.is_empty() {
                continue;
            }
            tracing::debug!(
                %matcher,
                query,
                count = candidates.len(),
                "Matcher active"
            );
            matches.insert(
                matcher,
                MatchDescriptor {
                    matcher,
                    query: query.to_string(),
                    range: token.range,
                    candidates,
                },
            );
        }

        Self {
            matches,
            active_index: 0,
        }
    }

    /// Returns true if no matcher has candidates.
    pub fn is_idle(&self) -> bool {
        self.active().is_none()
    }

    /// The descriptor that governs Enter and the arrow keys.
    pub fn active(&self) -> Option<&MatchDescriptor> {
        // BTreeMap iterates in declaration order
        self.matches.values().find(|d| !d.candidates.is_empty())
    }

    /// The descriptor a given matcher produced, if any.
    pub fn descriptor(&self, matcher: MatcherId) -> Option<&MatchDescriptor> {
        self.matches.get(&matcher)
    }

    /// Index of the highlighted candidate.
    pub fn active_index(&self) -> usize {
        self.active_index
    }

    /// The highlighted candidate.
    pub fn highlighted(&self) -> Option<&Candidate> {
        self.active()?.candidates.get(self.active_index)
    }

    /// Moves the highlight, clamped to the candidate list.
    ///
    /// Idle states are returned unchanged.
    pub fn navigate(&self, direction: Navigate) -> Self {
        let Some(count) = self.active().map(|d| d.candidates.len()) else {
            return self.clone();
        };
        let last = count.saturating_sub(1);
        let active_index = match direction {
            Navigate::Up => self.active_index.saturating_sub(1),
            Navigate::Down => (self.active_index + 1).min(last),
        };
        Self {
            matches: self.matches.clone(),
            active_index,
        }
    }

    /// Clears every matcher without committing.
    pub fn blur(&self) -> Self {
        Self::idle()
    }

    /// The first `max` candidates of the active matcher, for display.
    pub fn visible(&self, max: usize) -> &[Candidate] {
        match self.active() {
            Some(descriptor) => {
                let end = descriptor.candidates.len().min(max);
                &descriptor.candidates[..end]
            }
            None => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::InMemoryDataset;
    use proptest::prelude::*;
    use quill_doc::Point;

    fn dataset() -> InMemoryDataset {
        InMemoryDataset::new()
            .with_record("r1", "Abbot")
            .with_record("r2", "Abacus")
            .with_record("r3", "Cabal")
            .with_record("r4", "Abyss")
            .with_record("r5", "Tabard")
            .with_page("p1", "Xylophone")
    }

    fn scan(text: &str) -> BindingState {
        let doc = Document::from(text);
        let selection = Selection::collapsed(doc.end_point());
        BindingState::rescan(&doc, &selection, &dataset(), &mut Resolver::new())
    }

    #[test]
    fn test_record_reference_activates_record_matcher() {
        let state = scan("meet @ab");
        let active = state.active().unwrap();
        assert_eq!(active.matcher, MatcherId::Record);
        assert_eq!(active.query, "ab");
        assert_eq!(
            active.range,
            Range::new(Point::new(0, 5), Point::new(0, 8))
        );
        assert!(
            active
                .candidates
                .windows(2)
                .all(|w| w[0].score >= w[1].score)
        );
        assert!(state.descriptor(MatcherId::Page).is_none());
    }

    #[test]
    fn test_page_reference_leaves_record_idle() {
        let state = scan("see #xy");
        assert_eq!(state.active().unwrap().matcher, MatcherId::Page);
        assert!(state.descriptor(MatcherId::Record).is_none());
    }

    #[test]
    fn test_no_candidates_is_idle() {
        assert!(scan("@zzzz").is_idle());
        assert!(scan("plain words").is_idle());
        assert!(scan("mail@ab").is_idle());
        assert!(scan("@ab ").is_idle());
    }

    #[test]
    fn test_expanded_selection_is_idle() {
        let doc = Document::from("@ab");
        let selection = Selection::new(Point::new(0, 0), Point::new(0, 3));
        let state = BindingState::rescan(&doc, &selection, &dataset(), &mut Resolver::new());
        assert!(state.is_idle());
    }

    #[test]
    fn test_navigate_clamps() {
        let state = scan("@ab");
        let count = state.active().unwrap().candidates.len();
        assert!(count >= 2);

        let mut moved = state.navigate(Navigate::Up);
        assert_eq!(moved.active_index(), 0);
        for _ in 0..count + 3 {
            moved = moved.navigate(Navigate::Down);
        }
        assert_eq!(moved.active_index(), count - 1);
        assert_eq!(
            moved.highlighted(),
            state.active().unwrap().candidates.last()
        );
    }

    #[test]
    fn test_blur_clears() {
        let state = scan("@ab").navigate(Navigate::Down);
        let blurred = state.blur();
        assert!(blurred.is_idle());
        assert_eq!(blurred.active_index(), 0);
    }

    #[test]
    fn test_visible_caps_display() {
        let state = scan("@a");
        assert!(state.active().unwrap().candidates.len() > 2);
        assert_eq!(state.visible(2).len(), 2);
        assert!(BindingState::idle().visible(5).is_empty());
    }

    proptest! {
        #[test]
        fn prop_navigation_stays_in_bounds(moves in proptest::collection::vec(any::<bool>(), 0..40)) {
            let mut state = scan("@a");
            let count = state.active().unwrap().candidates.len();
            for down in moves {
                state = state.navigate(if down { Navigate::Down } else { Navigate::Up });
                prop_assert!(state.active_index() < count);
            }
        }

        #[test]
        fn prop_rescan_is_idempotent(query in "[a-zA-Z0-9]{1,6}") {
            let text = format!("note @{query}");
            prop_assert_eq!(scan(&text), scan(&text));
        }
    }
}
