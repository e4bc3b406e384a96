use clap::{Parser, Subcommand};

use crate::config::LogFormat;

#[derive(Parser)]
#[command(
    name = "reqledger",
    about = "reqledger: requirement assets, dependencies and lifecycle events over a JSONL ledger",
    version
)]
pub struct Cli {
    /// Path to a reqledger.toml config file (default: .reqledger/config.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Path to the ledger JSONL (overrides config)
    #[arg(long, global = true)]
    pub ledger: Option<String>,

    /// Path to the event log JSONL (overrides config)
    #[arg(long, global = true)]
    pub events: Option<String>,

    /// Log level or filter directive (overrides config; REQLEDGER_LOG wins)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_enum)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the .reqledger layout with an empty ledger, event log and config
    Init {
        /// Directory to initialize
        #[arg(default_value = ".")]
        path: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Asset lifecycle operations
    Asset {
        #[command(subcommand)]
        command: AssetCommands,
    },

    /// Dependency wiring and traversal
    Dep {
        #[command(subcommand)]
        command: DepCommands,
    },

    /// Dispatch a named operation with a raw JSON payload; prints the envelope
    Invoke {
        /// Operation name, e.g. NewAsset or TraceDependencies
        operation: String,

        /// JSON payload for the operation
        #[arg(long, default_value = "{}")]
        payload: String,

        /// Evaluate only: read-only operations, no ledger writes
        #[arg(long)]
        evaluate: bool,
    },

    /// Show the event log
    Events {
        /// Only show events with this name
        #[arg(long)]
        name: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum AssetCommands {
    /// Create a new asset
    New {
        /// Asset ID
        id: String,

        /// Initial content text
        text: String,

        /// Owner first name
        #[arg(long)]
        first_name: String,

        /// Owner last name
        #[arg(long)]
        last_name: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Share an asset with a new owner
    Share {
        /// Asset ID
        id: String,

        /// New owner first name
        #[arg(long)]
        first_name: String,

        /// New owner last name
        #[arg(long)]
        last_name: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Share several assets in order, emitting assetShared per asset
    ShareBulk {
        /// Asset IDs
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,

        /// New owner first name
        #[arg(long)]
        first_name: String,

        /// New owner last name
        #[arg(long)]
        last_name: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace an asset's content text
    Update {
        /// Asset ID
        id: String,

        /// New content text
        text: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Read an asset, recording first access
    Read {
        /// Asset ID
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show an asset without recording access
    Get {
        /// Asset ID
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show an asset's content
    Content {
        /// Asset ID
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum DepCommands {
    /// Replace an asset's dependencies with the given IDs
    Set {
        /// Source asset ID
        from: String,

        /// Dependency IDs, in order (none clears the set)
        to: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Point an asset at one existing asset
    Link {
        /// Source asset ID
        from: String,

        /// Target asset ID (must exist)
        to: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Walk dependencies breadth-first from a root asset
    Trace {
        /// Root asset ID
        root: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
