//! The book library shown before a book is opened.
//!
//! The library is a static manifest, an array of `{title, author, cover,
//! fileUrl}` records, fetched once at startup from a URL or read from a
//! local file. A failed fetch or parse degrades to a single textual
//! placeholder row; there is no retry.

use crate::storage::{self, KeyValueStore};
use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Label rendered when the manifest could not be loaded.
pub const LOAD_FAILED_PLACEHOLDER: &str = "Library could not be loaded";

static HTTP: Lazy<reqwest::blocking::Client> = Lazy::new(|| {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(20))
        .build()
        .unwrap_or_else(|_| reqwest::blocking::Client::new())
});

/// One book in the manifest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LibraryEntry {
    pub title: String,
    #[serde(default)]
    pub author: String,
    /// Cover image URL; optional.
    #[serde(default)]
    pub cover: Option<String>,
    pub file_url: String,
}

/// A row of the library list.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum LibraryRow {
    Placeholder { label: String },
    Book(LibraryEntry),
}

/// The loaded (or failed-to-load) library.
pub struct Library {
    entries: Vec<LibraryEntry>,
    error: Option<String>,
}

impl Library {
    /// Fetch the manifest over HTTP. Failure is remembered and rendered as
    /// the placeholder row.
    pub fn fetch(url: &str) -> Self {
        match fetch_manifest(url) {
            Ok(entries) => {
                info!(url, books = entries.len(), "Loaded library manifest");
                Library {
                    entries,
                    error: None,
                }
            }
            Err(err) => {
                warn!(url, "Failed to load library manifest: {err:#}");
                Library {
                    entries: Vec::new(),
                    error: Some(err.to_string()),
                }
            }
        }
    }

    /// Read the manifest from a local file.
    pub fn open_file(path: &Path) -> Self {
        let result = fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest at {}", path.display()))
            .and_then(|raw| parse_manifest(&raw));
        match result {
            Ok(entries) => Library {
                entries,
                error: None,
            },
            Err(err) => {
                warn!(path = %path.display(), "Failed to load library manifest: {err:#}");
                Library {
                    entries: Vec::new(),
                    error: Some(err.to_string()),
                }
            }
        }
    }

    pub fn entries(&self) -> &[LibraryEntry] {
        &self.entries
    }

    pub fn rows(&self) -> Vec<LibraryRow> {
        if self.error.is_some() {
            return vec![LibraryRow::Placeholder {
                label: LOAD_FAILED_PLACEHOLDER.to_string(),
            }];
        }
        self.entries
            .iter()
            .cloned()
            .map(LibraryRow::Book)
            .collect()
    }

    pub fn find(&self, file_url: &str) -> Option<&LibraryEntry> {
        self.entries.iter().find(|entry| entry.file_url == file_url)
    }
}

fn fetch_manifest(url: &str) -> Result<Vec<LibraryEntry>> {
    let raw = HTTP
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .with_context(|| format!("Manifest request to {url} failed"))?
        .text()
        .context("Manifest response was not readable text")?;
    parse_manifest(&raw)
}

fn parse_manifest(raw: &str) -> Result<Vec<LibraryEntry>> {
    serde_json::from_str(raw).context("Manifest was not a JSON array of books")
}

/// Remember which book the reader has open, for reopening on next launch.
pub fn remember_last_opened(store: &dyn KeyValueStore, book_id: &str) {
    store.set(storage::LAST_OPENED_KEY, book_id);
}

pub fn last_opened(store: &dyn KeyValueStore) -> Option<String> {
    store.get(storage::LAST_OPENED_KEY)
}
