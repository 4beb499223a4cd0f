//! User reading preferences, persisted one value per key in the shared
//! string store so the UI layer can read them back without parsing anything
//! structured.

use super::defaults;
use super::models::{FlowMode, FontChoice, ThemeMode};
use crate::storage::{self, KeyValueStore};
use serde::Serialize;
use tracing::debug;

/// Allowed font-size range, in percent of the publisher's base size.
pub const MIN_FONT_SIZE_PERCENT: u32 = 50;
pub const MAX_FONT_SIZE_PERCENT: u32 = 200;

/// The user-facing knobs: theme, font, font scale, and flow mode.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Preferences {
    pub theme: ThemeMode,
    pub font: FontChoice,
    /// Percent of the publisher's base size; 100 means unchanged.
    pub font_size: u32,
    pub reading_mode: FlowMode,
    /// Theme to return to when night mode toggles off. Not persisted.
    #[serde(skip)]
    last_non_night: ThemeMode,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            theme: ThemeMode::default(),
            font: FontChoice::default(),
            font_size: defaults::default_font_size_percent(),
            reading_mode: FlowMode::default(),
            last_non_night: ThemeMode::default(),
        }
    }
}

impl Preferences {
    /// Read every preference key; any missing or unrecognized value falls
    /// back to its default.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let theme = store
            .get(storage::THEME_KEY)
            .as_deref()
            .and_then(ThemeMode::from_storage)
            .unwrap_or_default();
        let font = store
            .get(storage::FONT_KEY)
            .as_deref()
            .and_then(FontChoice::from_storage)
            .unwrap_or_default();
        let font_size = store
            .get(storage::FONT_SIZE_KEY)
            .and_then(|value| value.trim().parse::<u32>().ok())
            .unwrap_or_else(defaults::default_font_size_percent)
            .clamp(MIN_FONT_SIZE_PERCENT, MAX_FONT_SIZE_PERCENT);
        let reading_mode = store
            .get(storage::READING_MODE_KEY)
            .as_deref()
            .and_then(FlowMode::from_storage)
            .unwrap_or_default();
        let last_non_night = if theme == ThemeMode::Night {
            ThemeMode::default()
        } else {
            theme
        };
        debug!(%theme, %font, font_size, %reading_mode, "Loaded preferences");
        Preferences {
            theme,
            font,
            font_size,
            reading_mode,
            last_non_night,
        }
    }

    pub fn save(&self, store: &dyn KeyValueStore) {
        store.set(storage::THEME_KEY, self.theme.storage_value());
        store.set(storage::FONT_KEY, self.font.storage_value());
        store.set(storage::FONT_SIZE_KEY, &self.font_size.to_string());
        store.set(
            storage::READING_MODE_KEY,
            self.reading_mode.storage_value(),
        );
    }

    pub fn set_theme(&mut self, theme: ThemeMode) {
        if theme != ThemeMode::Night {
            self.last_non_night = theme;
        }
        self.theme = theme;
    }

    /// Night mode toggles back to whichever non-night theme was active last.
    pub fn toggle_night(&mut self) {
        if self.theme == ThemeMode::Night {
            self.theme = self.last_non_night;
        } else {
            self.last_non_night = self.theme;
            self.theme = ThemeMode::Night;
        }
    }

    pub fn set_font_size(&mut self, percent: u32) {
        self.font_size = percent.clamp(MIN_FONT_SIZE_PERCENT, MAX_FONT_SIZE_PERCENT);
    }
}
