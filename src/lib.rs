//! Orchestration core of an e-book reading UI.
//!
//! The heavy lifting (EPUB parsing, layout, pagination, position
//! resolution) is delegated to a rendering engine behind
//! [`engine::RenderingEngine`]. What lives here is the glue a reader needs
//! around that engine: a book library, per-book bookmarks, a global
//! highlight/annotation store with its mark-mode interaction, user
//! preferences, in-book search, and the session object that ties them to
//! one open book. State is persisted through a string-keyed store
//! ([`storage::KeyValueStore`]) and surfaced to the UI as serializable
//! snapshots and list rows.

pub mod bookmarks;
pub mod config;
pub mod engine;
pub mod highlights;
pub mod library;
pub mod markup;
pub mod search;
pub mod session;
pub mod storage;

pub use bookmarks::{Bookmark, BookmarkRow, BookmarkStore, PageHint};
pub use config::{AppConfig, FlowMode, FontChoice, Preferences, ThemeMode, load_config};
pub use engine::{EngineEvent, EpubEngine, Location, RenderingEngine};
pub use highlights::{Highlight, HighlightColor, HighlightStore};
pub use library::{Library, LibraryEntry, LibraryRow};
pub use markup::{MarkupSession, Notice, NoticeKind};
pub use search::{RegexIndex, SearchIndex, SearchRecord};
pub use session::{ReaderSession, ReaderSnapshot, SessionCommand, SessionEvent};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
