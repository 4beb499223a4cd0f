//! Configuration loading for the reader.
//!
//! Two layers: `AppConfig` is operator configuration read from
//! `conf/config.toml` (logging, storage location, library manifest), while
//! `Preferences` are the user's reading knobs kept in the same string store
//! as the rest of the reader state. Missing or invalid entries fall back to
//! defaults so the UI can still launch.

mod defaults;
mod io;
mod models;
mod prefs;

pub use io::{load_config, parse_config, serialize_config};
pub use models::{AppConfig, FlowMode, FontChoice, LogLevel, ThemeMode};
pub use prefs::{MAX_FONT_SIZE_PERCENT, MIN_FONT_SIZE_PERCENT, Preferences};
