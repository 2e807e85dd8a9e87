use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod paths;
mod progress;
mod ui;

#[derive(Parser)]
#[command(name = "gare")]
#[command(about = "Infer relationships between people and companies, and lay them out.")]
#[command(version)]
struct Cli {
    /// Config file (default: $GARE_CONFIG or <data dir>/gare.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run relationship inference over a record snapshot
    Infer {
        /// Snapshot file (default: <data dir>/records.json)
        #[arg(value_name = "SNAPSHOT")]
        snapshot: Option<PathBuf>,

        /// Only infer for one record, e.g. person_12 or entity:3
        #[arg(long, value_name = "NODE")]
        record: Option<String>,

        /// Write new edges back to the snapshot
        #[arg(long, short)]
        write: bool,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compute a layout and print the render frame as JSON
    Layout {
        #[arg(value_name = "SNAPSHOT")]
        snapshot: Option<PathBuf>,

        /// force, hierarchical, circular, radial, grid, clustered, timeline, spiral, free
        #[arg(long, short)]
        strategy: Option<String>,

        #[arg(long)]
        width: Option<f64>,

        #[arg(long)]
        height: Option<f64>,

        /// Global link distance (50-300)
        #[arg(long)]
        link_distance: Option<f64>,
    },

    /// Interactive session: events on stdin, frames on stdout
    Session {
        #[arg(value_name = "SNAPSHOT")]
        snapshot: Option<PathBuf>,

        /// Frames per second while the layout is moving
        #[arg(long, default_value = "30")]
        fps: u32,

        /// Write edge changes back to the snapshot on exit
        #[arg(long, short)]
        write: bool,
    },

    /// Find records by name, document, phone or address
    Search {
        /// Text to look for
        query: String,

        #[arg(long, value_name = "SNAPSHOT")]
        snapshot: Option<PathBuf>,

        /// Maximum number of matches
        #[arg(long, short, default_value = "10")]
        limit: usize,

        /// Infer relationships for the best match and expand it
        #[arg(long)]
        locate: bool,

        /// Write edges created by --locate back to the snapshot
        #[arg(long, short)]
        write: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show record and edge counts
    Stats {
        #[arg(value_name = "SNAPSHOT")]
        snapshot: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine readable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = commands::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Infer {
            snapshot,
            record,
            write,
            json,
        } => commands::infer::run(config, snapshot, record, write, json),
        Commands::Layout {
            snapshot,
            strategy,
            width,
            height,
            link_distance,
        } => commands::layout::run(
            config,
            snapshot,
            commands::layout::LayoutArgs {
                strategy,
                width,
                height,
                link_distance,
            },
        ),
        Commands::Session {
            snapshot,
            fps,
            write,
        } => commands::session::run(config, snapshot, fps, write).await,
        Commands::Search {
            query,
            snapshot,
            limit,
            locate,
            write,
            json,
        } => commands::search::run(config, snapshot, &query, limit, locate, write, json),
        Commands::Stats { snapshot, json } => commands::stats::run(snapshot, json),
    }
}
