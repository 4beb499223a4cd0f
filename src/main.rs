//! Headless driver for the reader core.
//!
//! Responsibilities here are intentionally minimal:
//! - Parse command-line arguments.
//! - Load configuration from `conf/config.toml`.
//! - Show the library, or open a book and print its session snapshot.
//!
//! The real UI embeds the library crate and keeps the session alive across
//! user input; this binary exercises the same path once and exits.

use anyhow::{Result, anyhow};
use pagemark::config::load_config;
use pagemark::engine::EpubEngine;
use pagemark::library::Library;
use pagemark::search::RegexIndex;
use pagemark::session::{ReaderSession, SessionCommand};
use pagemark::storage::FileStore;
use std::env;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let config = load_config(Path::new("conf/config.toml"));
    set_log_level(reload_handle, config.log_level.as_filter_str());

    let store = Rc::new(FileStore::new(&config.storage_dir));

    let Some(book_path) = parse_args()? else {
        let Some(manifest) = config.library_manifest.as_deref() else {
            return Err(anyhow!(
                "Usage: pagemark <path-to-book>, or set library_manifest in conf/config.toml"
            ));
        };
        let library = if manifest.starts_with("http://") || manifest.starts_with("https://") {
            Library::fetch(manifest)
        } else {
            Library::open_file(Path::new(manifest))
        };
        for row in library.rows() {
            println!("{}", serde_json::to_string(&row)?);
        }
        return Ok(());
    };

    let book_id = book_path.to_string_lossy().to_string();
    let engine = EpubEngine::open(&book_path)?;
    let mut session = ReaderSession::open(
        &book_id,
        Box::new(engine),
        store,
        Box::new(RegexIndex::new()),
        config.chars_per_location,
    );
    session.apply_command(SessionCommand::GenerateLocations);
    let event = session.apply_command(SessionCommand::GetSnapshot);
    info!(
        book_id = %book_id,
        indicator = %event.snapshot.page_indicator,
        "Session ready"
    );
    println!("{}", serde_json::to_string_pretty(&event.snapshot)?);
    Ok(())
}

fn parse_args() -> Result<Option<PathBuf>> {
    let mut args = env::args().skip(1);
    let Some(path) = args.next() else {
        return Ok(None);
    };
    let path = PathBuf::from(path);
    if !path.exists() {
        return Err(anyhow!("File not found: {}", path.display()));
    }
    Ok(Some(path))
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_filter(filter_layer))
        .init();
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        tracing::warn!(%level, "Failed to update log level from config: {err}");
    }
}
