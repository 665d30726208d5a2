//! Fuzzy candidate resolution.
//!
//! Scores every dataset entry against the query with `nucleo-matcher` and
//! returns the hits best-first. The resolver caps nothing: how many
//! suggestions to show is the shell's business.
//!
//! ## Learning: Reusing Scratch Buffers
//!
//! `nucleo-matcher` works on UTF-32 haystacks. Converting each name needs
//! a `Vec<char>` scratch buffer; the resolver owns one and reuses it for
//! every entry, along with the `Matcher` and its internal allocations.

use nucleo_matcher::pattern::{CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Config, Matcher, Utf32Str};
use quill_doc::{InlineEntity, PageRef, RecordRef};

use crate::dataset::Dataset;
use crate::matcher::MatcherId;

/// A scored suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// The entity a commit would insert (a copy of the id/name pair)
    pub entity: InlineEntity,
    /// The flattened display name the query was scored against
    pub label: String,
    /// Match quality; higher is better
    pub score: u32,
}

impl AsRef<str> for Candidate {
    fn as_ref(&self) -> &str {
        &self.label
    }
}

/// Scores queries against datasets.
pub struct Resolver {
    matcher: Matcher,
    scratch: Vec<char>,
}

impl Resolver {
    /// Creates a resolver with the default matcher configuration.
    pub fn new() -> Self {
        Self {
            matcher: Matcher::new(Config::DEFAULT),
            scratch: Vec::new(),
        }
    }

    /// Ranks `(entity, label)` pairs against a query.
    ///
    /// Entries that do not match are dropped. Equal scores keep their input
    /// order, so the result is deterministic for a stable dataset. An empty
    /// query yields no candidates.
    pub fn resolve<I>(&mut self, query: &str, entries: I) -> Vec<Candidate>
    where
        I: IntoIterator<Item = (InlineEntity, String)>,
    {
        if query.trim().is_empty() {
            return Vec::new();
        }
        let pattern = Pattern::parse(query, CaseMatching::Ignore, Normalization::Smart);

        let mut candidates: Vec<Candidate> = entries
            .into_iter()
            .filter_map(|(entity, label)| {
                let haystack = Utf32Str::new(&label, &mut self.scratch);
                let score = pattern.score(haystack, &mut self.matcher)?;
                Some(Candidate {
                    entity,
                    label,
                    score,
                })
            })
            .collect();

        // Stable: ties stay in dataset order
        candidates.sort_by(|a, b| b.score.cmp(&a.score));
        candidates
    }

    /// Ranks the dataset's records.
    pub fn resolve_records(&mut self, query: &str, dataset: &dyn Dataset) -> Vec<Candidate> {
        let entries = dataset.records().into_iter().map(|record| {
            let label = record.name.flatten();
            let entity = InlineEntity::Record(RecordRef {
                id: record.id,
                name: label.clone(),
            });
            (entity, label)
        });
        self.resolve(query, entries)
    }

    /// Ranks the dataset's pages.
    pub fn resolve_pages(&mut self, query: &str, dataset: &dyn Dataset) -> Vec<Candidate> {
        let entries = dataset.pages().into_iter().map(|page| {
            let label = page.name.flatten();
            let entity = InlineEntity::Page(PageRef {
                key: page.key,
                name: label.clone(),
            });
            (entity, label)
        });
        self.resolve(query, entries)
    }

    /// Ranks the dataset a matcher searches.
    pub fn resolve_for(
        &mut self,
        matcher: MatcherId,
        query: &str,
        dataset: &dyn Dataset,
    ) -> Vec<Candidate> {
        match matcher {
            MatcherId::Record => self.resolve_records(query, dataset),
            MatcherId::Page => self.resolve_pages(query, dataset),
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver").finish_non_exhaustive()
    }
}
