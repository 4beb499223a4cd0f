//! The rendering-engine seam.
//!
//! All parsing, layout, pagination, and position (CFI) resolution belong to
//! an external engine; the reader only drives it through this trait and
//! consumes its settle events. Location payloads are modeled with explicit
//! optional fields: "no current location" and "no index known" are ordinary
//! states every consumer handles, not null-check afterthoughts.

mod epub;

pub use self::epub::EpubEngine;

use crate::config::{FlowMode, FontChoice, ThemeMode};
use serde::Serialize;

/// A settled position inside the rendered book.
///
/// `token` is opaque: only the engine that issued it can interpret it. The
/// index fields are hints the engine may or may not supply.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Location {
    pub token: String,
    /// Index of the containing spine item, when known.
    pub spine_index: Option<usize>,
    /// Flat location number (1-based), once locations are generated.
    pub location_index: Option<u64>,
    /// Text visible around the position, for snippet building.
    pub visible_text: Option<String>,
}

/// Events the engine fires after navigation settles.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Content was (re)rendered into the target surface.
    Rendered,
    /// The reading position changed.
    Relocated(Location),
}

/// One table-of-contents entry. Flat list; order follows the book.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TocEntry {
    pub label: String,
    pub href: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct BookMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
}

/// Decoded cover image.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverImage {
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

/// Extracted text of one spine section, with the token of its first
/// position. Feeds the search index.
#[derive(Debug, Clone, PartialEq)]
pub struct SectionText {
    pub spine_index: usize,
    pub location_token: String,
    pub text: String,
}

/// Per-document style overrides pushed into the engine after each render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleOverrides {
    pub theme: ThemeMode,
    pub font: FontChoice,
    pub font_size_percent: u32,
}

/// The external rendering engine, consumed as an opaque capability
/// provider. Opening a book happens at construction of an implementation.
///
/// Navigation methods return the settled location, or `None` when the
/// request had no effect (unknown target, or stepping past either end of
/// the spine); those cases are ignored, not errors.
pub trait RenderingEngine {
    /// Render at `target`, or at the book's start when `None`.
    fn display(&mut self, target: Option<&str>) -> Option<Location>;
    fn next(&mut self) -> Option<Location>;
    fn prev(&mut self) -> Option<Location>;
    fn current_location(&self) -> Option<Location>;

    /// Precompute flat locations of roughly `chars_per_location` characters
    /// each; afterwards `Location::location_index` and page totals become
    /// available. Returns the number of locations.
    fn generate_locations(&mut self, chars_per_location: usize) -> usize;
    fn location_count(&self) -> usize;
    fn spine_count(&self) -> usize;

    fn metadata(&self) -> BookMetadata;
    fn toc(&self) -> Vec<TocEntry>;
    fn cover(&self) -> Option<CoverImage>;
    fn sections(&mut self) -> Vec<SectionText>;

    fn apply_styles(&mut self, overrides: &StyleOverrides);
    fn set_flow(&mut self, flow: FlowMode);
}
