//! String-keyed persistent storage for reader state.
//!
//! Everything the reader remembers between launches goes through a single
//! string-to-string store, mirroring the browser-storage model the UI layer
//! expects: synchronous calls, no error surfaced to the caller, and a write
//! that fails simply leaves the old value behind. `FileStore` keeps one file
//! per key under a base directory, with the filename derived from a hash of
//! the key so arbitrary book URLs stay filesystem-safe.

use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

/// Prefix for per-book bookmark collections.
pub const BOOKMARKS_PREFIX: &str = "bookmarks_";
/// Prefix for per-book last-read positions.
pub const LAST_LOCATION_PREFIX: &str = "lastLocation_";
/// Single global key holding the highlight collection.
pub const HIGHLIGHTS_KEY: &str = "highlights";
/// Pointer to the most recently opened book.
pub const LAST_OPENED_KEY: &str = "last-opened-book";
/// Preference keys.
pub const THEME_KEY: &str = "theme";
pub const FONT_KEY: &str = "reader-font";
pub const FONT_SIZE_KEY: &str = "reader-font-size";
pub const READING_MODE_KEY: &str = "reading-mode";

/// Storage key for one book's bookmark collection.
pub fn bookmarks_key(book_id: &str) -> String {
    format!("{BOOKMARKS_PREFIX}{book_id}")
}

/// Storage key for one book's last-read location token.
pub fn last_location_key(book_id: &str) -> String {
    format!("{LAST_LOCATION_PREFIX}{book_id}")
}

/// Synchronous string-keyed storage.
///
/// Receivers are `&self`: the reader is a single-threaded UI actor and
/// implementations use interior mutability where they need it.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// One file per key under a base directory.
pub struct FileStore {
    base: PathBuf,
}

impl FileStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        FileStore { base: base.into() }
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let hash = format!("{:x}", hasher.finalize());
        self.base.join(hash)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.entry_path(key)).ok()
    }

    /// Errors are swallowed to keep the UI responsive; the previous value
    /// simply stays in place.
    fn set(&self, key: &str, value: &str) {
        let path = self.entry_path(key);
        if let Some(parent) = path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        if let Err(err) = fs::write(&path, value) {
            warn!(key, path = %path.display(), "Failed to persist value: {err}");
        }
    }

    fn remove(&self, key: &str) {
        let _ = fs::remove_file(self.entry_path(key));
    }
}

/// In-memory store for tests and embedders that manage durability
/// themselves.
#[derive(Default)]
pub struct MemoryStore {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(tag: &str) -> FileStore {
        let base = std::env::temp_dir().join(format!(
            "pagemark-storage-test-{}-{tag}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&base);
        FileStore::new(base)
    }

    #[test]
    fn file_store_round_trips_values() {
        let store = temp_store("roundtrip");
        assert_eq!(store.get("bookmarks_alice.epub"), None);

        store.set("bookmarks_alice.epub", "[]");
        assert_eq!(store.get("bookmarks_alice.epub").as_deref(), Some("[]"));

        store.set("bookmarks_alice.epub", "[1]");
        assert_eq!(store.get("bookmarks_alice.epub").as_deref(), Some("[1]"));

        store.remove("bookmarks_alice.epub");
        assert_eq!(store.get("bookmarks_alice.epub"), None);
    }

    #[test]
    fn file_store_accepts_url_keys() {
        let store = temp_store("urls");
        let key = bookmarks_key("https://books.example/shelf/moby%20dick.epub");
        store.set(&key, "data");
        assert_eq!(store.get(&key).as_deref(), Some("data"));
        // The on-disk name is the hash, not the raw key.
        let entry = store.entry_path(&key);
        let name = entry.file_name().and_then(|name| name.to_str()).unwrap();
        assert!(name.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn distinct_keys_do_not_collide() {
        let store = MemoryStore::new();
        store.set(&bookmarks_key("alice.epub"), "a");
        store.set(&bookmarks_key("bob.epub"), "b");
        assert_eq!(
            store.get(&bookmarks_key("alice.epub")).as_deref(),
            Some("a")
        );
        assert_eq!(store.get(&bookmarks_key("bob.epub")).as_deref(), Some("b"));
    }

    #[test]
    fn key_derivation_is_pure() {
        assert_eq!(bookmarks_key("x.epub"), "bookmarks_x.epub");
        assert_eq!(last_location_key("x.epub"), "lastLocation_x.epub");
        assert_eq!(bookmarks_key("x.epub"), bookmarks_key("x.epub"));
    }
}
