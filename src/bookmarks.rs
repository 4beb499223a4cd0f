//! Per-book bookmark collections.
//!
//! A bookmark is a saved reading position: the engine's opaque location
//! token, a short snippet of the text that was visible when the reader
//! tapped the star, and whatever page hint the engine offered at the time.
//! Collections are keyed by book source id, held fully in memory while the
//! book is open, and re-serialized whole to the store on every change.

use crate::storage::{self, KeyValueStore};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::rc::Rc;
use tracing::debug;

/// Snippets are capped at roughly this many characters.
pub const SNIPPET_MAX_CHARS: usize = 100;
const SNIPPET_ELLIPSIS: char = '…';

/// Label rendered when a book has no bookmarks.
pub const EMPTY_PLACEHOLDER: &str = "No bookmarks yet";

/// Engine-supplied position indicator attached to a bookmark.
///
/// The engine may not know a page number at save time; the stored value is
/// then the literal `"?"`. Either way this is an opaque display hint;
/// nothing computes against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageHint {
    At(u64),
    Unknown,
}

impl Default for PageHint {
    fn default() -> Self {
        PageHint::Unknown
    }
}

impl From<Option<u64>> for PageHint {
    fn from(value: Option<u64>) -> Self {
        match value {
            Some(page) => PageHint::At(page),
            None => PageHint::Unknown,
        }
    }
}

impl fmt::Display for PageHint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageHint::At(page) => write!(f, "{}", page),
            PageHint::Unknown => write!(f, "?"),
        }
    }
}

impl Serialize for PageHint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PageHint::At(page) => serializer.serialize_u64(*page),
            PageHint::Unknown => serializer.serialize_str("?"),
        }
    }
}

impl<'de> Deserialize<'de> for PageHint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HintVisitor;

        impl<'de> Visitor<'de> for HintVisitor {
            type Value = PageHint;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a page number or \"?\"")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<PageHint, E> {
                Ok(PageHint::At(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<PageHint, E> {
                Ok(u64::try_from(value)
                    .map(PageHint::At)
                    .unwrap_or(PageHint::Unknown))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> Result<PageHint, E> {
                if value.is_finite() && value >= 0.0 {
                    Ok(PageHint::At(value as u64))
                } else {
                    Ok(PageHint::Unknown)
                }
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<PageHint, E> {
                Ok(value
                    .trim()
                    .parse::<u64>()
                    .map(PageHint::At)
                    .unwrap_or(PageHint::Unknown))
            }

            fn visit_unit<E: de::Error>(self) -> Result<PageHint, E> {
                Ok(PageHint::Unknown)
            }

            fn visit_none<E: de::Error>(self) -> Result<PageHint, E> {
                Ok(PageHint::Unknown)
            }

            fn visit_some<D2: Deserializer<'de>>(self, d: D2) -> Result<PageHint, D2::Error> {
                PageHint::deserialize(d)
            }
        }

        deserializer.deserialize_any(HintVisitor)
    }
}

/// One saved reading position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bookmark {
    #[serde(rename = "locationToken")]
    pub location_token: String,
    pub snippet: String,
    #[serde(default)]
    pub page: PageHint,
}

/// A row of the bookmark panel. Activating an entry navigates to its token
/// and closes the panel; the placeholder is inert.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BookmarkRow {
    Placeholder {
        label: String,
    },
    Entry {
        #[serde(rename = "locationToken")]
        location_token: String,
        label: String,
        page: PageHint,
    },
}

/// Truncate visible text into a bookmark label.
pub fn snippet_from(text: &str) -> String {
    let trimmed = text.trim();
    let mut snippet: String = trimmed.chars().take(SNIPPET_MAX_CHARS).collect();
    if trimmed.chars().count() > SNIPPET_MAX_CHARS {
        snippet.push(SNIPPET_ELLIPSIS);
    }
    snippet
}

/// The bookmark collection for the currently open book.
pub struct BookmarkStore {
    store: Rc<dyn KeyValueStore>,
    book_id: Option<String>,
    entries: Vec<Bookmark>,
}

impl BookmarkStore {
    pub fn new(store: Rc<dyn KeyValueStore>) -> Self {
        BookmarkStore {
            store,
            book_id: None,
            entries: Vec::new(),
        }
    }

    /// Switch to a book's collection. The in-memory collection is reset
    /// before the new book's entries are read, so nothing from the previous
    /// book can leak across.
    pub fn open(&mut self, book_id: &str) {
        self.entries.clear();
        self.book_id = Some(book_id.to_string());
        self.entries = Self::load(self.store.as_ref(), book_id);
        debug!(book_id, count = self.entries.len(), "Loaded bookmarks");
    }

    /// Read one book's persisted collection. Missing or corrupt data reads
    /// as empty; this never fails.
    pub fn load(store: &dyn KeyValueStore, book_id: &str) -> Vec<Bookmark> {
        let key = storage::bookmarks_key(book_id);
        let Some(raw) = store.get(&key) else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                debug!(book_id, "Discarding unreadable bookmark data: {err}");
                Vec::new()
            }
        }
    }

    /// Add or remove the bookmark at `token`: present means remove, absent
    /// means append. The collection is persisted on both branches. Returns
    /// whether the position is bookmarked afterwards.
    pub fn toggle(
        &mut self,
        token: &str,
        snippet_source: impl FnOnce() -> String,
        page: PageHint,
    ) -> bool {
        if self.book_id.is_none() {
            debug!(token, "Bookmark toggle with no open book ignored");
            return false;
        }
        let now_bookmarked = match self
            .entries
            .iter()
            .position(|entry| entry.location_token == token)
        {
            Some(existing) => {
                self.entries.remove(existing);
                false
            }
            None => {
                self.entries.push(Bookmark {
                    location_token: token.to_string(),
                    snippet: snippet_from(&snippet_source()),
                    page,
                });
                true
            }
        };
        self.persist();
        now_bookmarked
    }

    pub fn contains(&self, token: &str) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.location_token == token)
    }

    pub fn entries(&self) -> &[Bookmark] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Panel rows in insertion order; an empty collection renders a single
    /// placeholder row.
    pub fn rows(&self) -> Vec<BookmarkRow> {
        if self.entries.is_empty() {
            return vec![BookmarkRow::Placeholder {
                label: EMPTY_PLACEHOLDER.to_string(),
            }];
        }
        self.entries
            .iter()
            .map(|entry| BookmarkRow::Entry {
                location_token: entry.location_token.clone(),
                label: entry.snippet.clone(),
                page: entry.page,
            })
            .collect()
    }

    fn persist(&self) {
        let Some(book_id) = self.book_id.as_deref() else {
            return;
        };
        match serde_json::to_string(&self.entries) {
            Ok(raw) => self.store.set(&storage::bookmarks_key(book_id), &raw),
            Err(err) => debug!(book_id, "Failed to serialize bookmarks: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn store_with_book(book_id: &str) -> (Rc<MemoryStore>, BookmarkStore) {
        let kv = Rc::new(MemoryStore::new());
        let mut bookmarks = BookmarkStore::new(kv.clone() as Rc<dyn KeyValueStore>);
        bookmarks.open(book_id);
        (kv, bookmarks)
    }

    #[test]
    fn empty_book_loads_as_empty_and_toggles_round_trip() {
        let (kv, mut bookmarks) = store_with_book("x.epub");
        assert!(bookmarks.is_empty());

        let added = bookmarks.toggle("loc-42", || "Hello world".to_string(), PageHint::Unknown);
        assert!(added);
        assert_eq!(
            kv.get(&storage::bookmarks_key("x.epub")).as_deref(),
            Some(r#"[{"locationToken":"loc-42","snippet":"Hello world","page":"?"}]"#)
        );

        let added = bookmarks.toggle("loc-42", || "Hello world".to_string(), PageHint::Unknown);
        assert!(!added);
        assert_eq!(
            kv.get(&storage::bookmarks_key("x.epub")).as_deref(),
            Some("[]")
        );
    }

    #[test]
    fn toggle_twice_restores_prior_content() {
        let (_kv, mut bookmarks) = store_with_book("x.epub");
        bookmarks.toggle("a", || "first".to_string(), PageHint::At(1));
        let before = bookmarks.entries().to_vec();

        bookmarks.toggle("b", || "second".to_string(), PageHint::At(2));
        bookmarks.toggle("b", || "second".to_string(), PageHint::At(2));

        assert_eq!(bookmarks.entries(), before.as_slice());
    }

    #[test]
    fn books_are_isolated_by_key() {
        let kv = Rc::new(MemoryStore::new());
        let mut bookmarks = BookmarkStore::new(kv.clone() as Rc<dyn KeyValueStore>);

        bookmarks.open("alice.epub");
        bookmarks.toggle("loc-1", || "from alice".to_string(), PageHint::Unknown);
        assert_eq!(bookmarks.entries().len(), 1);

        bookmarks.open("bob.epub");
        assert!(bookmarks.is_empty());
        assert!(!bookmarks.contains("loc-1"));

        bookmarks.open("alice.epub");
        assert!(bookmarks.contains("loc-1"));
    }

    #[test]
    fn corrupt_persisted_data_loads_as_empty() {
        let kv = MemoryStore::new();
        kv.set(&storage::bookmarks_key("x.epub"), "{not json at all");
        assert!(BookmarkStore::load(&kv, "x.epub").is_empty());

        kv.set(&storage::bookmarks_key("x.epub"), r#"{"an":"object"}"#);
        assert!(BookmarkStore::load(&kv, "x.epub").is_empty());
    }

    #[test]
    fn page_hint_accepts_numbers_strings_and_null() {
        let raw = r#"[
            {"locationToken":"a","snippet":"","page":7},
            {"locationToken":"b","snippet":"","page":"?"},
            {"locationToken":"c","snippet":"","page":null},
            {"locationToken":"d","snippet":""}
        ]"#;
        let entries: Vec<Bookmark> = serde_json::from_str(raw).unwrap();
        assert_eq!(entries[0].page, PageHint::At(7));
        assert_eq!(entries[1].page, PageHint::Unknown);
        assert_eq!(entries[2].page, PageHint::Unknown);
        assert_eq!(entries[3].page, PageHint::Unknown);
    }

    #[test]
    fn long_visible_text_is_truncated_with_ellipsis() {
        let text = "x".repeat(500);
        let snippet = snippet_from(&text);
        assert_eq!(snippet.chars().count(), SNIPPET_MAX_CHARS + 1);
        assert!(snippet.ends_with('…'));

        assert_eq!(snippet_from("short"), "short");
        assert_eq!(snippet_from(""), "");
    }

    #[test]
    fn rows_render_placeholder_then_entries_in_insertion_order() {
        let (_kv, mut bookmarks) = store_with_book("x.epub");
        assert_eq!(
            bookmarks.rows(),
            vec![BookmarkRow::Placeholder {
                label: EMPTY_PLACEHOLDER.to_string()
            }]
        );

        bookmarks.toggle("loc-9", || "nine".to_string(), PageHint::At(9));
        bookmarks.toggle("loc-2", || "two".to_string(), PageHint::At(2));
        let rows = bookmarks.rows();
        assert_eq!(rows.len(), 2);
        assert!(matches!(
            &rows[0],
            BookmarkRow::Entry { location_token, .. } if location_token == "loc-9"
        ));
        assert!(matches!(
            &rows[1],
            BookmarkRow::Entry { location_token, .. } if location_token == "loc-2"
        ));
    }
}
