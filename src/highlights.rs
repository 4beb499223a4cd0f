//! The global highlight/annotation collection.
//!
//! Highlights mark paragraphs of a single static document with a color and
//! an optional note. Unlike bookmarks they are not scoped per book: one
//! collection lives under a fixed key, loaded once at startup and rewritten
//! whole on every change. The persisted collection is the authoritative
//! state; paragraph coloring in the document is derived from it (see
//! `markup`).

use crate::storage::{self, KeyValueStore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// The four highlighter colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightColor {
    Yellow,
    Green,
    Blue,
    Pink,
}

impl Default for HighlightColor {
    fn default() -> Self {
        HighlightColor::Yellow
    }
}

impl HighlightColor {
    pub fn name(self) -> &'static str {
        match self {
            HighlightColor::Yellow => "yellow",
            HighlightColor::Green => "green",
            HighlightColor::Blue => "blue",
            HighlightColor::Pink => "pink",
        }
    }

    /// Hex used for the list view's left border.
    pub fn hex(self) -> &'static str {
        match self {
            HighlightColor::Yellow => "#ffeb3b",
            HighlightColor::Green => "#a5d6a7",
            HighlightColor::Blue => "#90caf9",
            HighlightColor::Pink => "#f48fb1",
        }
    }

    /// Stored color names outside the known set fall back to yellow, the
    /// first enumerated color.
    pub fn from_name(name: &str) -> Self {
        match name {
            "green" => HighlightColor::Green,
            "blue" => HighlightColor::Blue,
            "pink" => HighlightColor::Pink,
            _ => HighlightColor::Yellow,
        }
    }
}

impl Serialize for HighlightColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for HighlightColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(HighlightColor::from_name(&name))
    }
}

impl std::fmt::Display for HighlightColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One annotated paragraph.
///
/// `text` is the paragraph's content captured at creation time and never
/// rewritten; `note` is the only mutable field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Highlight {
    pub id: u64,
    #[serde(rename = "paragraphIndex")]
    pub paragraph_index: usize,
    pub text: String,
    pub color: HighlightColor,
    #[serde(default)]
    pub note: String,
    pub timestamp: u64,
}

/// Row of the annotation review panel.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct HighlightRow {
    pub id: u64,
    #[serde(rename = "paragraphIndex")]
    pub paragraph_index: usize,
    pub text: String,
    pub note: Option<String>,
    #[serde(rename = "borderColor")]
    pub border_color: &'static str,
}

pub struct HighlightStore {
    store: Rc<dyn KeyValueStore>,
    entries: Vec<Highlight>,
}

impl HighlightStore {
    /// Read the persisted collection once. Missing or corrupt data reads as
    /// empty.
    pub fn load(store: Rc<dyn KeyValueStore>) -> Self {
        let entries = store
            .get(storage::HIGHLIGHTS_KEY)
            .and_then(|raw| match serde_json::from_str(&raw) {
                Ok(entries) => Some(entries),
                Err(err) => {
                    debug!("Discarding unreadable highlight data: {err}");
                    None
                }
            })
            .unwrap_or_default();
        HighlightStore { store, entries }
    }

    /// Create a highlight. A paragraph carries at most one highlight: an
    /// existing entry at the same index is replaced rather than stacked,
    /// matching the bookmark store's toggle-by-key behavior.
    pub fn add(
        &mut self,
        paragraph_index: usize,
        text: &str,
        color: HighlightColor,
        note: &str,
    ) -> Highlight {
        self.entries
            .retain(|entry| entry.paragraph_index != paragraph_index);
        let now = unix_millis();
        let id = self
            .entries
            .iter()
            .map(|entry| entry.id)
            .max()
            .map_or(now, |max| now.max(max + 1));
        let entry = Highlight {
            id,
            paragraph_index,
            text: text.to_string(),
            color,
            note: note.trim().to_string(),
            timestamp: now,
        };
        self.entries.push(entry.clone());
        self.persist();
        entry
    }

    /// Overwrite the note of the highlight with `id`, leaving every other
    /// field and entry untouched. Unknown ids are ignored.
    pub fn edit_note(&mut self, id: u64, note: &str) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id) else {
            debug!(id, "Note edit for unknown highlight ignored");
            return false;
        };
        entry.note = note.trim().to_string();
        self.persist();
        true
    }

    /// Remove exactly the highlight with `id`; returns it so the caller can
    /// reset the paragraph's visual state.
    pub fn remove(&mut self, id: u64) -> Option<Highlight> {
        let position = self.entries.iter().position(|entry| entry.id == id)?;
        let removed = self.entries.remove(position);
        self.persist();
        Some(removed)
    }

    pub fn get(&self, id: u64) -> Option<&Highlight> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Insertion-order view of the stored collection.
    pub fn entries(&self) -> &[Highlight] {
        &self.entries
    }

    /// Review-panel rows ordered by paragraph position. Display-only: the
    /// stored collection keeps insertion order.
    pub fn list_rows(&self) -> Vec<HighlightRow> {
        let mut rows: Vec<HighlightRow> = self
            .entries
            .iter()
            .map(|entry| HighlightRow {
                id: entry.id,
                paragraph_index: entry.paragraph_index,
                text: entry.text.clone(),
                note: (!entry.note.is_empty()).then(|| entry.note.clone()),
                border_color: entry.color.hex(),
            })
            .collect();
        rows.sort_by_key(|row| row.paragraph_index);
        rows
    }

    /// Rebuild per-paragraph display state from the collection, for
    /// repainting the document after a reload.
    pub fn paragraph_marks(&self, paragraph_count: usize) -> Vec<Option<HighlightColor>> {
        let mut marks = vec![None; paragraph_count];
        for entry in &self.entries {
            if let Some(slot) = marks.get_mut(entry.paragraph_index) {
                *slot = Some(entry.color);
            }
        }
        marks
    }

    fn persist(&self) {
        match serde_json::to_string(&self.entries) {
            Ok(raw) => self.store.set(storage::HIGHLIGHTS_KEY, &raw),
            Err(err) => debug!("Failed to serialize highlights: {err}"),
        }
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn empty_store() -> (Rc<MemoryStore>, HighlightStore) {
        let kv = Rc::new(MemoryStore::new());
        let highlights = HighlightStore::load(kv.clone() as Rc<dyn KeyValueStore>);
        (kv, highlights)
    }

    #[test]
    fn commit_round_trips_with_empty_note() {
        let (kv, mut highlights) = empty_store();
        highlights.add(3, "third paragraph", HighlightColor::Green, "");

        let reloaded = HighlightStore::load(kv as Rc<dyn KeyValueStore>);
        assert_eq!(reloaded.entries().len(), 1);
        let entry = &reloaded.entries()[0];
        assert_eq!(entry.paragraph_index, 3);
        assert_eq!(entry.color, HighlightColor::Green);
        assert_eq!(entry.note, "");
        assert_eq!(entry.text, "third paragraph");
    }

    #[test]
    fn note_edit_changes_nothing_else() {
        let (_kv, mut highlights) = empty_store();
        let first = highlights.add(1, "one", HighlightColor::Yellow, "old");
        let second = highlights.add(2, "two", HighlightColor::Pink, "keep");

        assert!(highlights.edit_note(first.id, "  new note  "));

        let edited = highlights.get(first.id).unwrap();
        assert_eq!(edited.note, "new note");
        assert_eq!(edited.text, "one");
        assert_eq!(edited.color, HighlightColor::Yellow);
        assert_eq!(edited.paragraph_index, 1);
        assert_eq!(edited.timestamp, first.timestamp);
        assert_eq!(highlights.get(second.id), Some(&second));
    }

    #[test]
    fn note_edit_for_unknown_id_is_a_no_op() {
        let (_kv, mut highlights) = empty_store();
        let entry = highlights.add(1, "one", HighlightColor::Blue, "note");
        assert!(!highlights.edit_note(entry.id + 1, "other"));
        assert_eq!(highlights.get(entry.id).unwrap().note, "note");
    }

    #[test]
    fn delete_removes_exactly_the_matching_id() {
        // Duplicate paragraph indexes cannot arise through `add`, but the
        // store must still handle persisted data containing them.
        let kv = Rc::new(MemoryStore::new());
        kv.set(
            storage::HIGHLIGHTS_KEY,
            r#"[
                {"id":10,"paragraphIndex":4,"text":"a","color":"yellow","note":"","timestamp":10},
                {"id":11,"paragraphIndex":4,"text":"b","color":"blue","note":"","timestamp":11},
                {"id":12,"paragraphIndex":9,"text":"c","color":"pink","note":"","timestamp":12}
            ]"#,
        );
        let mut highlights = HighlightStore::load(kv as Rc<dyn KeyValueStore>);

        let removed = highlights.remove(11).unwrap();
        assert_eq!(removed.text, "b");
        let remaining: Vec<u64> = highlights.entries().iter().map(|e| e.id).collect();
        assert_eq!(remaining, vec![10, 12]);
    }

    #[test]
    fn list_rows_sort_by_paragraph_without_touching_storage_order() {
        let (kv, mut highlights) = empty_store();
        highlights.add(5, "five", HighlightColor::Yellow, "");
        highlights.add(1, "one", HighlightColor::Green, "");
        highlights.add(3, "three", HighlightColor::Blue, "");

        let order: Vec<usize> = highlights
            .list_rows()
            .iter()
            .map(|row| row.paragraph_index)
            .collect();
        assert_eq!(order, vec![1, 3, 5]);

        let stored: Vec<Highlight> = serde_json::from_str(
            &kv.get(storage::HIGHLIGHTS_KEY).unwrap(),
        )
        .unwrap();
        let stored_order: Vec<usize> = stored.iter().map(|e| e.paragraph_index).collect();
        assert_eq!(stored_order, vec![5, 1, 3]);
    }

    #[test]
    fn recommitting_a_paragraph_replaces_its_entry() {
        let (_kv, mut highlights) = empty_store();
        let first = highlights.add(2, "before", HighlightColor::Yellow, "");
        let second = highlights.add(2, "after", HighlightColor::Pink, "again");

        assert_eq!(highlights.entries().len(), 1);
        assert!(highlights.get(first.id).is_none());
        let entry = highlights.get(second.id).unwrap();
        assert_eq!(entry.text, "after");
        assert_eq!(entry.color, HighlightColor::Pink);
        assert_eq!(entry.note, "again");
    }

    #[test]
    fn ids_stay_unique_within_one_millisecond() {
        let (_kv, mut highlights) = empty_store();
        let a = highlights.add(1, "a", HighlightColor::Yellow, "");
        let b = highlights.add(2, "b", HighlightColor::Yellow, "");
        let c = highlights.add(3, "c", HighlightColor::Yellow, "");
        assert!(a.id < b.id && b.id < c.id);
    }

    #[test]
    fn unknown_color_falls_back_to_yellow() {
        let kv = Rc::new(MemoryStore::new());
        kv.set(
            storage::HIGHLIGHTS_KEY,
            r#"[{"id":1,"paragraphIndex":0,"text":"x","color":"chartreuse","note":"","timestamp":1}]"#,
        );
        let highlights = HighlightStore::load(kv as Rc<dyn KeyValueStore>);
        assert_eq!(highlights.entries()[0].color, HighlightColor::Yellow);
        assert_eq!(highlights.list_rows()[0].border_color, "#ffeb3b");
    }

    #[test]
    fn paragraph_marks_replay_persisted_colors() {
        let (_kv, mut highlights) = empty_store();
        highlights.add(0, "a", HighlightColor::Pink, "");
        highlights.add(2, "c", HighlightColor::Green, "");
        // An index beyond the document is ignored rather than panicking.
        highlights.add(99, "zz", HighlightColor::Blue, "");

        let marks = highlights.paragraph_marks(4);
        assert_eq!(
            marks,
            vec![
                Some(HighlightColor::Pink),
                None,
                Some(HighlightColor::Green),
                None
            ]
        );
    }
}
