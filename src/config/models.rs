use serde::{Deserialize, Serialize};

/// High-level app configuration; deserializable from TOML.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
    #[serde(default = "crate::config::defaults::default_storage_dir")]
    pub storage_dir: String,
    /// URL or local path of the library manifest; optional.
    #[serde(default)]
    pub library_manifest: Option<String>,
    #[serde(default = "crate::config::defaults::default_chars_per_location")]
    pub chars_per_location: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            log_level: crate::config::defaults::default_log_level(),
            storage_dir: crate::config::defaults::default_storage_dir(),
            library_manifest: None,
            chars_per_location: crate::config::defaults::default_chars_per_location(),
        }
    }
}

/// Theme choices offered by the reader chrome.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ThemeMode {
    Light,
    Sepia,
    Night,
}

impl Default for ThemeMode {
    fn default() -> Self {
        ThemeMode::Light
    }
}

impl ThemeMode {
    /// Value written into the preference store.
    pub fn storage_value(self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Sepia => "sepia",
            ThemeMode::Night => "night",
        }
    }

    pub fn from_storage(value: &str) -> Option<Self> {
        match value {
            "light" => Some(ThemeMode::Light),
            "sepia" => Some(ThemeMode::Sepia),
            "night" => Some(ThemeMode::Night),
            _ => None,
        }
    }
}

impl std::fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ThemeMode::Light => "Light",
            ThemeMode::Sepia => "Sepia",
            ThemeMode::Night => "Night",
        };
        write!(f, "{}", label)
    }
}

/// Font options surfaced by the font switcher.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FontChoice {
    Publisher,
    Serif,
    Sans,
    Dyslexic,
}

impl Default for FontChoice {
    fn default() -> Self {
        FontChoice::Publisher
    }
}

impl FontChoice {
    pub fn storage_value(self) -> &'static str {
        match self {
            FontChoice::Publisher => "publisher",
            FontChoice::Serif => "serif",
            FontChoice::Sans => "sans",
            FontChoice::Dyslexic => "dyslexic",
        }
    }

    pub fn from_storage(value: &str) -> Option<Self> {
        match value {
            "publisher" => Some(FontChoice::Publisher),
            "serif" => Some(FontChoice::Serif),
            "sans" => Some(FontChoice::Sans),
            "dyslexic" => Some(FontChoice::Dyslexic),
            _ => None,
        }
    }
}

impl std::fmt::Display for FontChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FontChoice::Publisher => "Publisher",
            FontChoice::Serif => "Serif",
            FontChoice::Sans => "Sans",
            FontChoice::Dyslexic => "Dyslexic",
        };
        write!(f, "{}", label)
    }
}

/// Layout flow requested from the rendering engine: discrete swipe pages or
/// one continuous scroll.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum FlowMode {
    Swipe,
    Scroll,
}

impl Default for FlowMode {
    fn default() -> Self {
        FlowMode::Swipe
    }
}

impl FlowMode {
    pub fn storage_value(self) -> &'static str {
        match self {
            FlowMode::Swipe => "swipe",
            FlowMode::Scroll => "scroll",
        }
    }

    pub fn from_storage(value: &str) -> Option<Self> {
        match value {
            "swipe" => Some(FlowMode::Swipe),
            "scroll" => Some(FlowMode::Scroll),
            _ => None,
        }
    }
}

impl std::fmt::Display for FlowMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FlowMode::Swipe => "Swipe",
            FlowMode::Scroll => "Scroll",
        };
        write!(f, "{}", label)
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Info
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
