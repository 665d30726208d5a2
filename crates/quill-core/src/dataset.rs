//! Host datasets that references resolve against.
//!
//! ## Learning: Trait Objects at the Boundary
//!
//! The editor never owns the host's records and pages. It reads them
//! through `Arc<dyn Dataset>`, so a host can plug in anything from a
//! static map to a live store. Every call returns a fresh snapshot: the
//! core never holds on to entries between two resolution passes.
//!
//! A host that mutates its data between events wraps it in a `RwLock`;
//! `Dataset` is implemented for `RwLock<D>` so the lock is taken only for
//! the duration of one snapshot.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use quill_doc::{PageKey, RecordId};
use serde::{Deserialize, Serialize};

/// A display name, either plain or a rich-text fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DisplayName {
    Plain(String),
    Rich(Vec<RichNode>),
}

/// A node of a rich-text display name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RichNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<RichNode>,
}

impl RichNode {
    fn collect_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(text);
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }
}

impl DisplayName {
    /// Flattens the name to plain text.
    ///
    /// A rich name contributes the text of its first node only, which is
    /// the title line of the fragment.
    pub fn flatten(&self) -> String {
        match self {
            DisplayName::Plain(name) => name.clone(),
            DisplayName::Rich(nodes) => {
                let mut out = String::new();
                if let Some(first) = nodes.first() {
                    first.collect_text(&mut out);
                }
                out
            }
        }
    }
}

impl From<&str> for DisplayName {
    fn from(name: &str) -> Self {
        DisplayName::Plain(name.to_string())
    }
}

impl Default for DisplayName {
    fn default() -> Self {
        DisplayName::Plain(String::new())
    }
}

/// A record as seen during one resolution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEntry {
    pub id: RecordId,
    pub name: DisplayName,
}

/// A page as seen during one resolution pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEntry {
    pub key: PageKey,
    pub name: DisplayName,
}

/// Read access to the host's records and pages.
pub trait Dataset: Send + Sync {
    /// Snapshot of every record, in a stable order.
    fn records(&self) -> Vec<RecordEntry>;

    /// Snapshot of every page, in a stable order.
    fn pages(&self) -> Vec<PageEntry>;
}

impl<D: Dataset> Dataset for RwLock<D> {
    fn records(&self) -> Vec<RecordEntry> {
        self.read()
            .unwrap_or_else(PoisonError::into_inner)
            .records()
    }

    fn pages(&self) -> Vec<PageEntry> {
        self.read().unwrap_or_else(PoisonError::into_inner).pages()
    }
}

/// Fields the host stores per entry; anything else is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EntryFields {
    #[serde(default)]
    pub name: DisplayName,
}

/// A dataset held in memory, ordered by id.
///
/// Deserializes from the host's shape:
///
/// ```json
/// { "records": { "r1": { "name": "Goblin" } }, "pages": { "town": { "name": "Town" } } }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemoryDataset {
    records: BTreeMap<RecordId, EntryFields>,
    pages: BTreeMap<PageKey, EntryFields>,
}

impl InMemoryDataset {
    /// Creates an empty dataset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a dataset from JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Adds or replaces a record.
    pub fn insert_record(&mut self, id: impl Into<RecordId>, name: impl Into<DisplayName>) {
        self.records.insert(
            id.into(),
            EntryFields {
                name: name.into(),
            },
        );
    }

    /// Adds or replaces a page.
    pub fn insert_page(&mut self, key: impl Into<PageKey>, name: impl Into<DisplayName>) {
        self.pages.insert(
            key.into(),
            EntryFields {
                name: name.into(),
            },
        );
    }

    /// Removes a record, returning true if it existed.
    pub fn remove_record(&mut self, id: &RecordId) -> bool {
        self.records.remove(id).is_some()
    }

    /// Builder-style [`insert_record`](Self::insert_record).
    pub fn with_record(mut self, id: &str, name: &str) -> Self {
        self.insert_record(id, name);
        self
    }

    /// Builder-style [`insert_page`](Self::insert_page).
    pub fn with_page(mut self, key: &str, name: &str) -> Self {
        self.insert_page(key, name);
        self
    }
}

impl Dataset for InMemoryDataset {
    fn records(&self) -> Vec<RecordEntry> {
        self.records
            .iter()
            .map(|(id, fields)| RecordEntry {
                id: id.clone(),
                name: fields.name.clone(),
            })
            .collect()
    }

    fn pages(&self) -> Vec<PageEntry> {
        self.pages
            .iter()
            .map(|(key, fields)| PageEntry {
                key: key.clone(),
                name: fields.name.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rich_name_flattens_first_node() {
        let json = r#"[
            { "children": [{ "text": "Old " }, { "text": "Mill" }] },
            { "children": [{ "text": "ignored" }] }
        ]"#;
        let name: DisplayName = serde_json::from_str(json).unwrap();
        assert_eq!(name.flatten(), "Old Mill");
        assert_eq!(DisplayName::from("plain").flatten(), "plain");
    }

    #[test]
    fn test_dataset_from_json() {
        let json = r#"{
            "records": {
                "r2": { "name": "Orc", "hp": 15 },
                "r1": { "name": [{ "children": [{ "text": "Goblin" }] }] }
            },
            "pages": { "town": { "name": "Town" } }
        }"#;
        let dataset = InMemoryDataset::from_json(json).unwrap();

        let records = dataset.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, RecordId::new("r1"));
        assert_eq!(records[0].name.flatten(), "Goblin");
        assert_eq!(dataset.pages()[0].key, PageKey::new("town"));
    }

    #[test]
    fn test_rwlock_dataset_sees_updates() {
        let shared = RwLock::new(InMemoryDataset::new().with_record("r1", "Goblin"));
        assert_eq!(Dataset::records(&shared).len(), 1);

        shared.write().unwrap().insert_record("r2", "Orc");
        assert_eq!(Dataset::records(&shared).len(), 2);

        assert!(shared.write().unwrap().remove_record(&RecordId::new("r1")));
        assert_eq!(Dataset::records(&shared).len(), 1);
    }
}
