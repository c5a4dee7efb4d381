//! Graphnote Command Line Interface
//!
//! Drives the item manager against a running graph server and prints the
//! view events each command produced.
//!
//! # Usage
//!
//! ```bash
//! # Load (or initialize) the repository
//! graphnote_cli bootstrap
//!
//! # Create a note linked to the visible context
//! graphnote_cli create note
//!
//! # Switch the visible context / list children
//! graphnote_cli show <key>
//! graphnote_cli expand <key>
//!
//! # Mutate
//! graphnote_cli set <key> '"new text"'
//! graphnote_cli link <source> <target>...
//! graphnote_cli remove <key>...
//! ```

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use graphnote::{App, GraphnoteConfig, ItemKey, ItemType, ViewEvent};
use graphnote_client::HttpGraphClient;
use serde_json::Value;

#[derive(Parser)]
#[command(name = "graphnote_cli")]
#[command(version = "0.1.0")]
#[command(about = "Graph cache CLI for a graphnote server")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Server root URL
    #[arg(long, env = "GRAPHNOTE_ENDPOINT", global = true)]
    endpoint: Option<String>,

    /// Key of the repository root item
    #[arg(long, env = "GRAPHNOTE_ROOT_KEY", global = true)]
    root_key: Option<String>,

    /// Traversal depth of main-view reloads
    #[arg(long, env = "GRAPHNOTE_DEPTH", global = true)]
    depth: Option<usize>,

    /// Output format: json or pretty (default)
    #[arg(long, short = 'o', global = true, default_value = "pretty", value_enum)]
    format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the service items and load the default context
    Bootstrap,

    /// Make an item the visible context
    Show { key: String },

    /// List the children of an item
    Expand { key: String },

    /// Create an item linked to the visible context
    Create {
        /// Item type: tag or note
        item_type: ItemType,
    },

    /// Set the value of an item (JSON, plain text falls back to a string)
    Set { key: String, value: String },

    /// Link a source item to targets
    Link {
        source: String,
        #[arg(required = true)]
        targets: Vec<String>,
    },

    /// Remove links from a source item to targets
    Unlink {
        source: String,
        #[arg(required = true)]
        targets: Vec<String>,
    },

    /// Remove items
    Remove {
        #[arg(required = true)]
        keys: Vec<String>,
    },
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = cli.format;

    match run(cli).await {
        Ok(events) => match print_events(&events, format) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => report(&e, format),
        },
        Err(e) => report(&e, format),
    }
}

fn report(error: &anyhow::Error, format: OutputFormat) -> ExitCode {
    if format == OutputFormat::Json {
        println!("{}", serde_json::json!({ "error": format!("{error:#}") }));
    } else {
        eprintln!("{}: {:#}", "error".red().bold(), error);
    }
    ExitCode::FAILURE
}

fn config_from(cli: &Cli) -> Result<GraphnoteConfig> {
    let mut config = GraphnoteConfig::default();
    if let Some(endpoint) = &cli.endpoint {
        config = config.with_endpoint(endpoint)?;
    }
    if let Some(root_key) = &cli.root_key {
        config = config.with_root_key(ItemKey::from(root_key.as_str()));
    }
    if let Some(depth) = cli.depth {
        config = config.with_depth(depth);
    }
    Ok(config)
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

async fn run(cli: Cli) -> Result<Vec<ViewEvent>> {
    let config = config_from(&cli)?;
    let client = HttpGraphClient::new(&config.endpoint)
        .with_context(|| format!("cannot reach endpoint {}", config.endpoint))?;
    let (app, events) = App::new(config, Arc::new(client));

    app.start().await.context("bootstrap failed")?;

    let items = app.items();
    match cli.command {
        Commands::Bootstrap => {}
        Commands::Show { key } => items.show_children(&[key.into()], false).await?,
        Commands::Expand { key } => items.show_children(&[key.into()], true).await?,
        Commands::Create { item_type } => {
            items.create_item(item_type).await?;
        }
        Commands::Set { key, value } => {
            let value = serde_json::from_str(&value).unwrap_or(Value::String(value));
            items.save_item(value, &key.into()).await?;
        }
        Commands::Link { source, targets } => {
            items.link_items(&source.into(), &to_keys(targets)).await?
        }
        Commands::Unlink { source, targets } => {
            items.unlink_items(&source.into(), &to_keys(targets)).await?
        }
        Commands::Remove { keys } => items.remove_items(&to_keys(keys)).await?,
    }

    Ok(events.drain())
}

fn to_keys(keys: Vec<String>) -> Vec<ItemKey> {
    keys.into_iter().map(ItemKey::from).collect()
}

fn print_events(events: &[ViewEvent], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(events)?);
        }
        OutputFormat::Pretty => {
            for event in events {
                println!("{} {}", "▸".cyan(), event.name().bold());
                println!("{}", serde_json::to_string_pretty(event)?);
            }
        }
    }
    Ok(())
}
