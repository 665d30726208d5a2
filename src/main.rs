//! # Quill - Live Entity Binding for Rich Text
//!
//! A terminal shell over the quill editor core. It loads a document value
//! and a dataset, replays a key script against them and prints what a
//! host would see.
//!
//! ## Quick Start
//!
//! ```bash
//! # Type into an empty document
//! cargo run -- --script "Meet @gob{Enter} and roll 2d6 "
//!
//! # Edit an existing value against a dataset
//! cargo run -- --value note.json --dataset campaign.json --script "{End} ok"
//! ```

mod script;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quill_core::{
    Config, EditorEvent, Editor, EventHandler, InMemoryDataset, render_document,
    render_suggestions,
};
use quill_doc::DocumentValue;

/// Quill - replay keystrokes against a rich-text document
#[derive(Parser, Debug)]
#[command(name = "quill")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Document value to start from (JSON)
    #[arg(long, value_name = "FILE")]
    value: Option<PathBuf>,

    /// Records and pages to resolve references against (JSON)
    #[arg(short, long, value_name = "FILE")]
    dataset: Option<PathBuf>,

    /// Config file (defaults to the user config directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Keys to replay; `{Enter}`, `{Shift+Enter}`, `{Meta+b}` name keys
    #[arg(short, long, default_value = "")]
    script: String,

    /// Print the resulting value as JSON
    #[arg(long)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    // Parse command line arguments
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
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    tracing::info!("Starting Quill v{}", env!("CARGO_PKG_VERSION"));

    let config = match &args.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load(),
    };

    let dataset = match &args.dataset {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read dataset {}", path.display()))?;
            InMemoryDataset::from_json(&json).context("Invalid dataset")?
        }
        None => InMemoryDataset::new(),
    };

    let value = match &args.value {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read value {}", path.display()))?;
            DocumentValue::from_json(&json).context("Invalid document value")?
        }
        None => DocumentValue::empty(),
    };

    let max_visible = config.editor.suggestions.max_visible;
    let mut editor = Editor::with_config(config, Arc::new(dataset)).with_value(&value);
    let mut events = EventHandler::new(editor.subscribe());

    let keys = script::parse(&args.script)?;
    tracing::info!("Replaying {} keys", keys.len());
    for key in keys {
        editor.handle_key(key);
    }

    println!(
        "{}",
        render_document(editor.document(), Some(editor.selection().focus))
    );
    print!("{}", render_suggestions(editor.binding(), max_visible));

    for notification in events.drain() {
        match notification.event {
            EditorEvent::Changed(_) => {}
            event => println!("event: {:?}", event),
        }
    }

    if args.json {
        println!("{}", editor.value().to_json()?);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["quill"]);
        assert!(args.value.is_none());
        assert!(args.script.is_empty());
        assert!(!args.json);
    }

    #[test]
    fn test_args_with_script() {
        let args = Args::parse_from(["quill", "-d", "data.json", "-s", "@gob{Enter}", "-vv"]);
        assert_eq!(args.dataset, Some(PathBuf::from("data.json")));
        assert_eq!(args.script, "@gob{Enter}");
        assert_eq!(args.verbose, 2);
    }
}
