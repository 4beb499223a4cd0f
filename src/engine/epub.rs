//! EPUB-backed implementation of the rendering-engine seam.
//!
//! The `epub` crate does the real parsing; this adapter walks the spine once
//! at open, strips markup with a lightweight HTML-to-text pass, and serves
//! navigation over the extracted text. Position tokens are synthetic
//! (`pos:<char-offset>`) and only this adapter interprets them; to the rest
//! of the reader they are as opaque as any engine's fragment identifiers.

use super::{
    BookMetadata, CoverImage, Location, RenderingEngine, SectionText, StyleOverrides, TocEntry,
};
use crate::config::FlowMode;
use anyhow::{Context, Result};
use epub::doc::EpubDoc;
use image::GenericImageView;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const TOKEN_PREFIX: &str = "pos:";
/// Characters of context returned as `visible_text` around a position.
const VISIBLE_TEXT_CHARS: usize = 240;

pub struct EpubEngine {
    source: PathBuf,
    metadata: BookMetadata,
    toc: Vec<TocEntry>,
    cover: Option<CoverImage>,
    /// Extracted text per spine section.
    sections: Vec<String>,
    /// Char offset of each section's start within the whole book.
    section_starts: Vec<usize>,
    total_chars: usize,
    /// Char offsets of generated flat locations; empty until generated.
    locations: Vec<usize>,
    /// Current position as a global char offset; `None` before `display`.
    offset: Option<usize>,
    flow: FlowMode,
    styles: Option<StyleOverrides>,
}

impl EpubEngine {
    /// Open a book by its source path.
    pub fn open(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "Opening EPUB");
        let mut doc = EpubDoc::new(path)
            .with_context(|| format!("Failed to open EPUB at {}", path.display()))?;

        let metadata = BookMetadata {
            title: doc.mdata("title").map(|m| m.value.clone()),
            author: doc.mdata("creator").map(|m| m.value.clone()),
        };
        let toc = doc
            .toc
            .iter()
            .map(|nav| TocEntry {
                label: nav.label.clone(),
                href: nav.content.to_string_lossy().to_string(),
            })
            .collect();
        let cover = decode_cover(&mut doc, path);

        let mut sections = Vec::new();
        loop {
            match doc.get_current_str() {
                Some((chapter, _mime)) => {
                    // Strip markup; fall back to the raw chapter on errors.
                    // A very large width avoids baking in hard line breaks.
                    let plain = match html2text::from_read(chapter.as_bytes(), 10_000) {
                        Ok(clean) => clean,
                        Err(err) => {
                            warn!(section = sections.len(), "html2text failed: {err}");
                            chapter
                        }
                    };
                    sections.push(plain);
                }
                None => break,
            }
            if !doc.go_next() {
                break;
            }
        }

        let mut section_starts = Vec::with_capacity(sections.len());
        let mut total_chars = 0usize;
        for section in &sections {
            section_starts.push(total_chars);
            total_chars += section.chars().count();
        }
        info!(
            sections = sections.len(),
            total_chars,
            title = metadata.title.as_deref().unwrap_or("?"),
            "Finished loading EPUB content"
        );

        Ok(EpubEngine {
            source: path.to_path_buf(),
            metadata,
            toc,
            cover,
            sections,
            section_starts,
            total_chars,
            locations: Vec::new(),
            offset: None,
            flow: FlowMode::default(),
            styles: None,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Flow mode last requested through [`RenderingEngine::set_flow`].
    pub fn flow(&self) -> FlowMode {
        self.flow
    }

    /// Style overrides last pushed into the document, if any.
    pub fn active_styles(&self) -> Option<StyleOverrides> {
        self.styles
    }

    #[cfg(test)]
    fn from_sections(texts: Vec<&str>) -> Self {
        let sections: Vec<String> = texts.into_iter().map(str::to_string).collect();
        let mut section_starts = Vec::with_capacity(sections.len());
        let mut total_chars = 0usize;
        for section in &sections {
            section_starts.push(total_chars);
            total_chars += section.chars().count();
        }
        EpubEngine {
            source: PathBuf::from("test.epub"),
            metadata: BookMetadata::default(),
            toc: Vec::new(),
            cover: None,
            sections,
            section_starts,
            total_chars,
            locations: Vec::new(),
            offset: None,
            flow: FlowMode::default(),
            styles: None,
        }
    }

    fn location_at(&self, offset: usize) -> Location {
        let spine_index = if self.section_starts.is_empty() {
            None
        } else {
            Some(
                self.section_starts
                    .partition_point(|&start| start <= offset)
                    .saturating_sub(1),
            )
        };
        let location_index = if self.locations.is_empty() {
            None
        } else {
            // partition_point yields the 1-based flat location number.
            Some(self.locations.partition_point(|&start| start <= offset) as u64)
        };
        Location {
            token: format!("{TOKEN_PREFIX}{offset}"),
            spine_index,
            location_index,
            visible_text: self.visible_text_at(offset, spine_index),
        }
    }

    fn visible_text_at(&self, offset: usize, spine_index: Option<usize>) -> Option<String> {
        let index = spine_index?;
        let section = self.sections.get(index)?;
        let local = offset - self.section_starts.get(index).copied()?;
        let text: String = section.chars().skip(local).take(VISIBLE_TEXT_CHARS).collect();
        (!text.trim().is_empty()).then(|| text)
    }

    fn jump_targets(&self) -> &[usize] {
        if self.locations.is_empty() {
            &self.section_starts
        } else {
            &self.locations
        }
    }
}

impl RenderingEngine for EpubEngine {
    fn display(&mut self, target: Option<&str>) -> Option<Location> {
        let offset = match target {
            None => 0,
            Some(token) => match parse_token(token, self.total_chars) {
                Some(offset) => offset,
                None => {
                    debug!(token, "Ignoring display request for unknown target");
                    return None;
                }
            },
        };
        self.offset = Some(offset);
        Some(self.location_at(offset))
    }

    fn next(&mut self) -> Option<Location> {
        let current = self.offset?;
        let targets = self.jump_targets();
        let next = targets
            .get(targets.partition_point(|&start| start <= current))
            .copied();
        match next {
            Some(offset) => {
                self.offset = Some(offset);
                Some(self.location_at(offset))
            }
            None => {
                debug!("Already at the last position; next ignored");
                None
            }
        }
    }

    fn prev(&mut self) -> Option<Location> {
        let current = self.offset?;
        let targets = self.jump_targets();
        let before = targets.partition_point(|&start| start < current);
        match before.checked_sub(1).and_then(|idx| targets.get(idx)).copied() {
            Some(offset) => {
                self.offset = Some(offset);
                Some(self.location_at(offset))
            }
            None => {
                debug!("Already at the first position; prev ignored");
                None
            }
        }
    }

    fn current_location(&self) -> Option<Location> {
        self.offset.map(|offset| self.location_at(offset))
    }

    fn generate_locations(&mut self, chars_per_location: usize) -> usize {
        self.locations = chunk_starts(self.total_chars, chars_per_location);
        debug!(
            count = self.locations.len(),
            chars_per_location, "Generated flat locations"
        );
        self.locations.len()
    }

    fn location_count(&self) -> usize {
        self.locations.len()
    }

    fn spine_count(&self) -> usize {
        self.sections.len()
    }

    fn metadata(&self) -> BookMetadata {
        self.metadata.clone()
    }

    fn toc(&self) -> Vec<TocEntry> {
        self.toc.clone()
    }

    fn cover(&self) -> Option<CoverImage> {
        self.cover.clone()
    }

    fn sections(&mut self) -> Vec<SectionText> {
        self.sections
            .iter()
            .enumerate()
            .map(|(spine_index, text)| SectionText {
                spine_index,
                location_token: format!("{TOKEN_PREFIX}{}", self.section_starts[spine_index]),
                text: text.clone(),
            })
            .collect()
    }

    fn apply_styles(&mut self, overrides: &StyleOverrides) {
        debug!(
            theme = %overrides.theme,
            font = %overrides.font,
            font_size = overrides.font_size_percent,
            "Applied style overrides"
        );
        self.styles = Some(*overrides);
    }

    fn set_flow(&mut self, flow: FlowMode) {
        debug!(%flow, "Flow mode changed");
        self.flow = flow;
    }
}

fn parse_token(token: &str, total_chars: usize) -> Option<usize> {
    let offset = token.strip_prefix(TOKEN_PREFIX)?.parse::<usize>().ok()?;
    (offset == 0 || offset < total_chars).then_some(offset)
}

fn chunk_starts(total_chars: usize, chars_per_location: usize) -> Vec<usize> {
    if total_chars == 0 {
        return Vec::new();
    }
    (0..total_chars)
        .step_by(chars_per_location.max(1))
        .collect()
}

/// Cover extraction is best-effort: a missing or undecodable image is
/// skipped with a diagnostic log and the reader shows no cover.
fn decode_cover(
    doc: &mut EpubDoc<std::io::BufReader<std::fs::File>>,
    path: &Path,
) -> Option<CoverImage> {
    let Some((bytes, _mime)) = doc.get_cover() else {
        debug!(path = %path.display(), "Book has no cover image");
        return None;
    };
    match image::load_from_memory(&bytes) {
        Ok(decoded) => {
            let (width, height) = decoded.dimensions();
            Some(CoverImage {
                width,
                height,
                bytes,
            })
        }
        Err(err) => {
            debug!(path = %path.display(), "Skipping unreadable cover image: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> EpubEngine {
        // Three sections of 10, 5, and 8 chars.
        EpubEngine::from_sections(vec!["abcdefghij", "klmno", "pqrstuvw"])
    }

    #[test]
    fn display_none_starts_at_the_beginning() {
        let mut engine = engine();
        let loc = engine.display(None).unwrap();
        assert_eq!(loc.token, "pos:0");
        assert_eq!(loc.spine_index, Some(0));
        assert_eq!(loc.location_index, None);
        assert_eq!(loc.visible_text.as_deref(), Some("abcdefghij"));
    }

    #[test]
    fn display_accepts_only_tokens_it_minted() {
        let mut engine = engine();
        assert!(engine.display(Some("pos:12")).is_some());
        assert_eq!(engine.current_location().unwrap().spine_index, Some(1));

        assert!(engine.display(Some("pos:9999")).is_none());
        assert!(engine.display(Some("epubcfi(/6/4!/4)")).is_none());
        // The failed requests left the position untouched.
        assert_eq!(engine.current_location().unwrap().token, "pos:12");
    }

    #[test]
    fn next_and_prev_walk_sections_and_stop_at_the_ends() {
        let mut engine = engine();
        assert!(engine.next().is_none(), "no position before display");

        engine.display(None);
        assert_eq!(engine.next().unwrap().token, "pos:10");
        assert_eq!(engine.next().unwrap().token, "pos:15");
        assert!(engine.next().is_none());
        assert_eq!(engine.prev().unwrap().token, "pos:10");
        assert_eq!(engine.prev().unwrap().token, "pos:0");
        assert!(engine.prev().is_none());
    }

    #[test]
    fn generated_locations_refine_navigation_and_number_pages() {
        let mut engine = engine();
        // 23 chars total at 6 per location -> starts at 0, 6, 12, 18.
        assert_eq!(engine.generate_locations(6), 4);
        assert_eq!(engine.location_count(), 4);

        engine.display(None);
        let loc = engine.current_location().unwrap();
        assert_eq!(loc.location_index, Some(1));

        let loc = engine.next().unwrap();
        assert_eq!(loc.token, "pos:6");
        assert_eq!(loc.location_index, Some(2));
        assert_eq!(loc.spine_index, Some(0));
    }

    #[test]
    fn empty_book_generates_no_locations() {
        let mut engine = EpubEngine::from_sections(vec![]);
        assert_eq!(engine.generate_locations(1024), 0);
        let loc = engine.display(None).unwrap();
        assert_eq!(loc.spine_index, None);
        assert_eq!(loc.visible_text, None);
    }

    #[test]
    fn sections_expose_tokens_for_indexing() {
        let mut engine = engine();
        let sections = engine.sections();
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[1].location_token, "pos:10");
        assert_eq!(sections[2].text, "pqrstuvw");
    }

    #[test]
    fn chunk_starts_cover_the_tail() {
        assert_eq!(chunk_starts(10, 4), vec![0, 4, 8]);
        assert_eq!(chunk_starts(8, 4), vec![0, 4]);
        assert_eq!(chunk_starts(0, 4), Vec::<usize>::new());
        assert_eq!(chunk_starts(3, 0), vec![0, 1, 2]);
    }
}
