//! # Boxy - A Structural Box Editor
//!
//! Headless front end for the box editor: load a document, replay key
//! presses through the keymap and print or save the result.
//!
//! ## Quick Start
//!
//! ```bash
//! # Print a document's serialization
//! cargo run -- notes.box
//!
//! # Type a box and save it
//! cargo run -- notes.box --keys "[ h i ] ctrl+x ctrl+s"
//!
//! # Print the rows of the top-level box
//! cargo run -- notes.box --rows
//! ```

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use boxy_core::{Config, Editor, EditorEvent, KeyPress};

/// Boxy - a structural editor for nested boxes of text
#[derive(Parser, Debug)]
#[command(name = "boxy")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Document to open. Created on write if it does not exist.
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Key presses to replay, separated by spaces (e.g. "ctrl+f [ a ]")
    #[arg(short, long, value_name = "KEYS")]
    keys: Option<String>,

    /// Print the rows of the top-level box instead of its serialization
    #[arg(short, long)]
    rows: bool,

    /// Save the document after replaying keys
    #[arg(short, long)]
    write: bool,

    /// Config file to use instead of the default location
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = match args.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    tracing::info!("Starting Boxy v{}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load(),
    };
    let mut editor = Editor::with_config(config);

    if let Some(path) = args.file.as_deref().filter(|p| p.exists()) {
        editor
            .open_file(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
    }

    let mut events = editor.subscribe();
    if let Some(keys) = &args.keys {
        let presses = KeyPress::parse_sequence(keys)
            .ok_or_else(|| anyhow::anyhow!("Invalid key sequence: {}", keys))?;
        editor.handle_keys(presses);
    }
    while let Ok(event) = events.try_recv() {
        if let EditorEvent::Alert(message) = event {
            eprintln!("{}", message);
        }
    }

    if args.write {
        match &args.file {
            Some(path) => editor.save_as(path)?,
            None => anyhow::bail!("Nothing to write: no FILE given"),
        }
    }

    let doc = editor.document();
    if args.rows {
        for row in doc.box_rows_text(doc.tree().root()) {
            println!("{}", row);
        }
    } else {
        println!("{}", doc.text());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["boxy"]);
        assert!(args.file.is_none());
        assert!(args.keys.is_none());
        assert!(!args.rows);
        assert!(!args.write);
    }

    #[test]
    fn test_args_with_file_and_keys() {
        let args = Args::parse_from(["boxy", "notes.box", "--keys", "[ a ]", "-w", "-vv"]);
        assert_eq!(args.file, Some(PathBuf::from("notes.box")));
        assert_eq!(args.keys.as_deref(), Some("[ a ]"));
        assert!(args.write);
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_replayed_keys_build_a_box() {
        let mut editor = Editor::new();
        let keys = KeyPress::parse_sequence("[ h i ]").unwrap();
        editor.handle_keys(keys);
        assert_eq!(editor.document().text(), "[hi]");
    }
}
