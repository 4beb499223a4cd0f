pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Info
}

pub(crate) fn default_storage_dir() -> String {
    ".reader-cache".to_string()
}

pub(crate) fn default_chars_per_location() -> usize {
    1024
}

pub(crate) fn default_font_size_percent() -> u32 {
    100
}
