//! The reader session: one open book, one explicit context object.
//!
//! The session owns the engine handle, the shared store, the book's bookmark
//! collection, and the user preferences; nothing lives in globals. The UI
//! layer drives it with commands and receives an event carrying a full
//! serializable snapshot, and feeds engine settle events back in through
//! `handle_event`. Every store mutation completes synchronously inside the
//! command that caused it.

use crate::bookmarks::{self, BookmarkRow, BookmarkStore, PageHint};
use crate::config::{FlowMode, FontChoice, Preferences, ThemeMode};
use crate::engine::{BookMetadata, EngineEvent, Location, RenderingEngine, StyleOverrides, TocEntry};
use crate::library;
use crate::search::{SearchHit, SearchIndex, SearchRecord};
use crate::storage::{self, KeyValueStore};
use serde::Serialize;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, info};

/// Cosmetic page-turn transition length. The UI may animate for this long;
/// nothing blocks on it.
pub const PAGE_TURN_DELAY: Duration = Duration::from_millis(300);

/// Which overlay panels are open.
#[derive(Debug, Clone, Copy, Serialize, Default, PartialEq, Eq)]
pub struct PanelState {
    pub bookmarks: bool,
    pub toc: bool,
    pub search: bool,
    pub settings: bool,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum TurnDirection {
    Forward,
    Backward,
}

/// Hint that a page turn just happened, with the animation length.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PageTransition {
    pub direction: TurnDirection,
    pub duration: Duration,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SearchResultRow {
    pub id: usize,
    pub excerpt: String,
    #[serde(rename = "locationToken")]
    pub location_token: String,
    pub selected: bool,
}

/// Everything the UI needs to render the reader after a command.
#[derive(Debug, Clone, Serialize)]
pub struct ReaderSnapshot {
    pub book_id: String,
    pub metadata: BookMetadata,
    pub toc: Vec<TocEntry>,
    pub current_token: Option<String>,
    pub page_indicator: String,
    pub bookmarked_here: bool,
    pub bookmark_rows: Vec<BookmarkRow>,
    pub panels: PanelState,
    pub preferences: Preferences,
    pub search_query: String,
    pub search_results: Vec<SearchResultRow>,
    pub transition: Option<PageTransition>,
}

#[derive(Debug, Clone)]
pub enum SessionCommand {
    GetSnapshot,
    NextPage,
    PrevPage,
    DisplayAt { token: String },
    ToggleBookmark,
    OpenBookmark { token: String },
    OpenTocEntry { href: String },
    ToggleBookmarkPanel,
    ToggleTocPanel,
    ToggleSearchPanel,
    ToggleSettingsPanel,
    ClosePanels,
    SetTheme { theme: ThemeMode },
    ToggleNightTheme,
    SetFont { font: FontChoice },
    SetFontSize { percent: u32 },
    SetFlow { flow: FlowMode },
    SearchSetQuery { query: String },
    SearchNext,
    SearchPrev,
    OpenSearchResult,
    GenerateLocations,
}

impl SessionCommand {
    pub fn action(&self) -> &'static str {
        match self {
            Self::GetSnapshot => "reader_get_snapshot",
            Self::NextPage => "reader_next_page",
            Self::PrevPage => "reader_prev_page",
            Self::DisplayAt { .. } => "reader_display_at",
            Self::ToggleBookmark => "reader_toggle_bookmark",
            Self::OpenBookmark { .. } => "reader_open_bookmark",
            Self::OpenTocEntry { .. } => "reader_open_toc_entry",
            Self::ToggleBookmarkPanel => "reader_toggle_bookmark_panel",
            Self::ToggleTocPanel => "reader_toggle_toc_panel",
            Self::ToggleSearchPanel => "reader_toggle_search_panel",
            Self::ToggleSettingsPanel => "reader_toggle_settings_panel",
            Self::ClosePanels => "reader_close_panels",
            Self::SetTheme { .. } => "reader_set_theme",
            Self::ToggleNightTheme => "reader_toggle_night_theme",
            Self::SetFont { .. } => "reader_set_font",
            Self::SetFontSize { .. } => "reader_set_font_size",
            Self::SetFlow { .. } => "reader_set_flow",
            Self::SearchSetQuery { .. } => "reader_search_set_query",
            Self::SearchNext => "reader_search_next",
            Self::SearchPrev => "reader_search_prev",
            Self::OpenSearchResult => "reader_open_search_result",
            Self::GenerateLocations => "reader_generate_locations",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub action: &'static str,
    pub snapshot: ReaderSnapshot,
}

pub struct ReaderSession {
    book_id: String,
    engine: Box<dyn RenderingEngine>,
    store: Rc<dyn KeyValueStore>,
    bookmarks: BookmarkStore,
    prefs: Preferences,
    index: Box<dyn SearchIndex>,
    metadata: BookMetadata,
    toc: Vec<TocEntry>,
    panels: PanelState,
    current: Option<Location>,
    page_indicator: String,
    bookmarked_here: bool,
    search_query: String,
    search_hits: Vec<SearchHit>,
    selected_hit: Option<usize>,
    transition: Option<PageTransition>,
    chars_per_location: usize,
}

impl ReaderSession {
    /// Open a book. The previous book's in-memory bookmark collection (if
    /// the caller reuses the store) is gone by construction: this session
    /// loads only `book_id`'s collection. The last-read position, when one
    /// is stored and still resolvable, becomes the initial display target.
    pub fn open(
        book_id: &str,
        mut engine: Box<dyn RenderingEngine>,
        store: Rc<dyn KeyValueStore>,
        mut index: Box<dyn SearchIndex>,
        chars_per_location: usize,
    ) -> Self {
        let prefs = Preferences::load(store.as_ref());
        let mut bookmarks = BookmarkStore::new(store.clone());
        bookmarks.open(book_id);
        library::remember_last_opened(store.as_ref(), book_id);

        let metadata = engine.metadata();
        let toc = engine.toc();
        let records: Vec<SearchRecord> = engine
            .sections()
            .into_iter()
            .map(|section| SearchRecord {
                id: section.spine_index,
                text: section.text,
                location_token: section.location_token,
            })
            .collect();
        index.build(records);

        let mut session = ReaderSession {
            book_id: book_id.to_string(),
            engine,
            store,
            bookmarks,
            prefs,
            index,
            metadata,
            toc,
            panels: PanelState::default(),
            current: None,
            page_indicator: String::new(),
            bookmarked_here: false,
            search_query: String::new(),
            search_hits: Vec::new(),
            selected_hit: None,
            transition: None,
            chars_per_location,
        };

        session.engine.set_flow(session.prefs.reading_mode);
        let stored = session
            .store
            .get(&storage::last_location_key(&session.book_id));
        let initial = match stored.as_deref() {
            Some(token) => session
                .engine
                .display(Some(token))
                .or_else(|| session.engine.display(None)),
            None => session.engine.display(None),
        };
        session.handle_event(EngineEvent::Rendered);
        if let Some(location) = initial {
            session.handle_event(EngineEvent::Relocated(location));
        }
        info!(
            book_id,
            title = session.metadata.title.as_deref().unwrap_or("?"),
            resumed = stored.is_some(),
            "Opened book"
        );
        session
    }

    pub fn book_id(&self) -> &str {
        &self.book_id
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn current_token(&self) -> Option<&str> {
        self.current.as_ref().map(|location| location.token.as_str())
    }

    /// Engine settle events. The real engine calls this from its
    /// rendered/relocated callbacks; internal navigation feeds the same
    /// path so both stay in sync.
    pub fn handle_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Rendered => {
                let overrides = self.style_overrides();
                self.engine.apply_styles(&overrides);
                self.current = self.engine.current_location();
                self.refresh_location_ui();
            }
            EngineEvent::Relocated(location) => {
                if !location.token.is_empty() {
                    self.store.set(
                        &storage::last_location_key(&self.book_id),
                        &location.token,
                    );
                }
                self.current = Some(location);
                self.refresh_location_ui();
            }
        }
    }

    pub fn apply_command(&mut self, command: SessionCommand) -> SessionEvent {
        let action = command.action();
        self.transition = None;
        match command {
            SessionCommand::GetSnapshot => {}
            SessionCommand::NextPage => self.turn_page(TurnDirection::Forward),
            SessionCommand::PrevPage => self.turn_page(TurnDirection::Backward),
            SessionCommand::DisplayAt { token } => self.display_at(&token),
            SessionCommand::ToggleBookmark => self.toggle_bookmark(),
            SessionCommand::OpenBookmark { token } => {
                self.panels.bookmarks = false;
                self.display_at(&token);
            }
            SessionCommand::OpenTocEntry { href } => {
                self.panels.toc = false;
                self.display_at(&href);
            }
            SessionCommand::ToggleBookmarkPanel => {
                self.panels.bookmarks = !self.panels.bookmarks;
            }
            SessionCommand::ToggleTocPanel => self.panels.toc = !self.panels.toc,
            SessionCommand::ToggleSearchPanel => self.panels.search = !self.panels.search,
            SessionCommand::ToggleSettingsPanel => {
                self.panels.settings = !self.panels.settings;
            }
            SessionCommand::ClosePanels => self.panels = PanelState::default(),
            SessionCommand::SetTheme { theme } => {
                self.prefs.set_theme(theme);
                self.persist_prefs_and_restyle();
            }
            SessionCommand::ToggleNightTheme => {
                self.prefs.toggle_night();
                self.persist_prefs_and_restyle();
            }
            SessionCommand::SetFont { font } => {
                self.prefs.font = font;
                self.persist_prefs_and_restyle();
            }
            SessionCommand::SetFontSize { percent } => {
                self.prefs.set_font_size(percent);
                self.persist_prefs_and_restyle();
            }
            SessionCommand::SetFlow { flow } => {
                self.prefs.reading_mode = flow;
                self.engine.set_flow(flow);
                self.persist_prefs_and_restyle();
            }
            SessionCommand::SearchSetQuery { query } => self.search_set_query(query),
            SessionCommand::SearchNext => self.search_step(1),
            SessionCommand::SearchPrev => self.search_step(-1),
            SessionCommand::OpenSearchResult => self.open_search_result(),
            SessionCommand::GenerateLocations => {
                let count = self.engine.generate_locations(self.chars_per_location);
                debug!(count, "Locations ready");
                self.current = self.engine.current_location();
                self.refresh_location_ui();
            }
        }
        SessionEvent {
            action,
            snapshot: self.snapshot(),
        }
    }

    pub fn snapshot(&self) -> ReaderSnapshot {
        ReaderSnapshot {
            book_id: self.book_id.clone(),
            metadata: self.metadata.clone(),
            toc: self.toc.clone(),
            current_token: self.current.as_ref().map(|loc| loc.token.clone()),
            page_indicator: self.page_indicator.clone(),
            bookmarked_here: self.bookmarked_here,
            bookmark_rows: self.bookmarks.rows(),
            panels: self.panels,
            preferences: self.prefs.clone(),
            search_query: self.search_query.clone(),
            search_results: self.search_result_rows(),
            transition: self.transition,
        }
    }

    fn turn_page(&mut self, direction: TurnDirection) {
        let moved = match direction {
            TurnDirection::Forward => self.engine.next(),
            TurnDirection::Backward => self.engine.prev(),
        };
        match moved {
            Some(location) => {
                self.transition = Some(PageTransition {
                    direction,
                    duration: PAGE_TURN_DELAY,
                });
                self.handle_event(EngineEvent::Relocated(location));
            }
            None => debug!(?direction, "No further page; staying put"),
        }
    }

    /// Navigate to a token or href. An unresolvable target is ignored.
    fn display_at(&mut self, target: &str) {
        match self.engine.display(Some(target)) {
            Some(location) => {
                self.handle_event(EngineEvent::Rendered);
                self.handle_event(EngineEvent::Relocated(location));
            }
            None => debug!(target, "Navigation target not found; ignored"),
        }
    }

    /// Star tap. Needs a settled location; without one this does nothing.
    fn toggle_bookmark(&mut self) {
        let Some(location) = self.current.clone() else {
            debug!("Bookmark toggle with no current location ignored");
            return;
        };
        let page = PageHint::from(location.location_index);
        let visible = location.visible_text.unwrap_or_default();
        self.bookmarked_here = self
            .bookmarks
            .toggle(&location.token, move || visible, page);
        debug!(
            token = %location.token,
            bookmarked = self.bookmarked_here,
            "Toggled bookmark"
        );
    }

    fn search_set_query(&mut self, query: String) {
        self.search_hits = self.index.query(&query);
        self.search_query = query;
        self.selected_hit = (!self.search_hits.is_empty()).then_some(0);
    }

    fn search_step(&mut self, delta: isize) {
        if self.search_hits.is_empty() {
            self.selected_hit = None;
            return;
        }
        let len = self.search_hits.len();
        self.selected_hit = Some(match (self.selected_hit, delta >= 0) {
            (None, true) => 0,
            (None, false) => len - 1,
            (Some(current), true) => (current + 1) % len,
            (Some(current), false) => (current + len - 1) % len,
        });
    }

    fn open_search_result(&mut self) {
        let Some(selected) = self.selected_hit else {
            return;
        };
        let Some(hit) = self.search_hits.get(selected).copied() else {
            return;
        };
        let Some(token) = self
            .index
            .resolve(hit.id)
            .map(|record| record.location_token.clone())
        else {
            return;
        };
        self.panels.search = false;
        self.display_at(&token);
    }

    fn search_result_rows(&self) -> Vec<SearchResultRow> {
        self.search_hits
            .iter()
            .enumerate()
            .filter_map(|(idx, hit)| {
                self.index.resolve(hit.id).map(|record| SearchResultRow {
                    id: record.id,
                    excerpt: bookmarks::snippet_from(&record.text),
                    location_token: record.location_token.clone(),
                    selected: self.selected_hit == Some(idx),
                })
            })
            .collect()
    }

    fn persist_prefs_and_restyle(&mut self) {
        self.prefs.save(self.store.as_ref());
        let overrides = self.style_overrides();
        self.engine.apply_styles(&overrides);
    }

    fn style_overrides(&self) -> StyleOverrides {
        StyleOverrides {
            theme: self.prefs.theme,
            font: self.prefs.font,
            font_size_percent: self.prefs.font_size,
        }
    }

    fn refresh_location_ui(&mut self) {
        self.bookmarked_here = self
            .current
            .as_ref()
            .is_some_and(|location| self.bookmarks.contains(&location.token));
        self.page_indicator = self.format_page_indicator();
    }

    /// `Ch <chapter>/<chapters> Pg <location>/<locations>`, or empty while
    /// there is no settled position or locations are not yet generated.
    fn format_page_indicator(&self) -> String {
        let Some(location) = &self.current else {
            return String::new();
        };
        if location.token.is_empty() || self.engine.location_count() == 0 {
            return String::new();
        }
        let chapter = location.spine_index.unwrap_or(0) + 1;
        let chapter_total = match self.engine.spine_count() {
            0 => "?".to_string(),
            count => count.to_string(),
        };
        let page = location.location_index.unwrap_or(0);
        let page_total = self.engine.location_count();
        format!("Ch {chapter}/{chapter_total} Pg {page}/{page_total}")
    }
}
