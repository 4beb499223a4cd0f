//! Mark-mode interaction on top of the highlight store.
//!
//! A paragraph moves Idle → Selected → Committed: clicking while mark mode
//! is on selects it and opens the color/note entry surface, saving commits
//! it, and cancel (or leaving mark mode) drops the selection without
//! persisting anything. The per-paragraph color vector here mirrors what the
//! document shows; the persisted collection stays authoritative and is
//! replayed onto the paragraphs whenever the document is rebuilt.

use crate::highlights::{Highlight, HighlightColor, HighlightRow, HighlightStore};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

/// How long a confirmation toast stays on screen. Cosmetic only.
pub const NOTICE_AUTO_DISMISS: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum NoticeKind {
    HighlightSaved,
    HighlightWithNoteSaved,
    NoteUpdated,
    HighlightRemoved,
}

/// Transient confirmation shown after a highlight action.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    #[serde(rename = "dismissAfter")]
    pub dismiss_after: Duration,
}

impl Notice {
    fn new(kind: NoticeKind, message: &str) -> Self {
        Notice {
            kind,
            message: message.to_string(),
            dismiss_after: NOTICE_AUTO_DISMISS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Selection {
    paragraph_index: usize,
    text: String,
}

/// Markup interaction state for one rendered document.
pub struct MarkupSession {
    highlights: HighlightStore,
    paragraph_count: usize,
    marks: Vec<Option<HighlightColor>>,
    mark_mode: bool,
    selection: Option<Selection>,
    pending_color: HighlightColor,
}

impl MarkupSession {
    /// Wrap the store and replay its entries onto the document's paragraphs.
    pub fn new(highlights: HighlightStore, paragraph_count: usize) -> Self {
        let marks = highlights.paragraph_marks(paragraph_count);
        MarkupSession {
            highlights,
            paragraph_count,
            marks,
            mark_mode: false,
            selection: None,
            pending_color: HighlightColor::default(),
        }
    }

    pub fn mark_mode(&self) -> bool {
        self.mark_mode
    }

    pub fn enter_mark_mode(&mut self) {
        self.mark_mode = true;
    }

    /// Leaving mark mode mid-selection drops the selection's visual state
    /// without creating a highlight.
    pub fn exit_mark_mode(&mut self) {
        self.mark_mode = false;
        self.selection = None;
    }

    /// A paragraph click. Interpreted as highlight-target selection only
    /// while mark mode is on; any prior selection is replaced.
    pub fn paragraph_clicked(&mut self, paragraph_index: usize, text: &str) {
        if !self.mark_mode {
            return;
        }
        if paragraph_index >= self.paragraph_count {
            debug!(paragraph_index, "Click outside the document ignored");
            return;
        }
        self.selection = Some(Selection {
            paragraph_index,
            text: text.to_string(),
        });
        self.pending_color = HighlightColor::default();
    }

    /// Update the pending color; nothing is persisted yet.
    pub fn choose_color(&mut self, color: HighlightColor) {
        self.pending_color = color;
    }

    /// Persist the pending highlight. Without an active selection this is a
    /// silent no-op.
    pub fn commit(&mut self, note: &str) -> Option<Notice> {
        let selection = self.selection.take()?;
        let entry = self.highlights.add(
            selection.paragraph_index,
            &selection.text,
            self.pending_color,
            note,
        );
        if let Some(slot) = self.marks.get_mut(selection.paragraph_index) {
            *slot = Some(entry.color);
        }
        debug!(
            paragraph = selection.paragraph_index,
            color = %entry.color,
            with_note = !entry.note.is_empty(),
            "Committed highlight"
        );
        Some(if entry.note.is_empty() {
            Notice::new(NoticeKind::HighlightSaved, "Highlight saved")
        } else {
            Notice::new(NoticeKind::HighlightWithNoteSaved, "Highlight and note saved")
        })
    }

    /// Drop the selection without persisting anything.
    pub fn cancel(&mut self) {
        self.selection = None;
    }

    pub fn edit_note(&mut self, id: u64, note: &str) -> Option<Notice> {
        self.highlights
            .edit_note(id, note)
            .then(|| Notice::new(NoticeKind::NoteUpdated, "Note updated"))
    }

    /// Delete a highlight and clear its paragraph back to the default
    /// display state.
    pub fn delete(&mut self, id: u64) -> Option<Notice> {
        let removed = self.highlights.remove(id)?;
        if let Some(slot) = self.marks.get_mut(removed.paragraph_index) {
            *slot = None;
        }
        Some(Notice::new(NoticeKind::HighlightRemoved, "Highlight removed"))
    }

    /// Committed color per paragraph, in document order.
    pub fn marks(&self) -> &[Option<HighlightColor>] {
        &self.marks
    }

    pub fn selected_paragraph(&self) -> Option<usize> {
        self.selection
            .as_ref()
            .map(|selection| selection.paragraph_index)
    }

    pub fn list_rows(&self) -> Vec<HighlightRow> {
        self.highlights.list_rows()
    }

    pub fn highlight(&self, id: u64) -> Option<&Highlight> {
        self.highlights.get(id)
    }
}
