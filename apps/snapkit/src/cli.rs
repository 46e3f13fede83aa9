//! Command line interface definition

use clap::{Args, Parser, Subcommand};
use snapkit_types::OutputFormat;
use std::path::PathBuf;

/// snapkit - client for snapd and the Snap Store
#[derive(Parser)]
#[command(name = "snapkit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Client for snapd and the Snap Store")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Args)]
pub struct GlobalArgs {
    /// Output in JSON format (same as --output json)
    #[arg(long, global = true)]
    pub json: bool,

    /// Output format; overrides the configured default
    #[arg(long, global = true, value_enum, conflicts_with = "json")]
    pub output: Option<OutputFormat>,

    /// Enable debug logging to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Talk to snapd through this UNIX socket
    #[arg(long, global = true, value_name = "PATH", conflicts_with = "tcp")]
    pub socket: Option<PathBuf>,

    /// Talk to snapd through a TCP bridge, e.g. http://127.0.0.1:8181
    #[arg(long, global = true, value_name = "URL")]
    pub tcp: Option<String>,

    /// Give up waiting for a change after this many seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub poll_timeout: Option<u64>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Check that snapd answers
    Ping,

    /// List installed snaps
    #[command(alias = "ls")]
    List,

    /// Show an installed snap
    Info {
        /// Snap name
        snap: String,
    },

    /// Install a snap from the store
    #[command(alias = "i")]
    Install {
        /// Snap name
        snap: String,

        /// Channel to install from, e.g. latest/edge
        #[arg(long)]
        channel: Option<String>,

        /// Specific revision to install
        #[arg(long)]
        revision: Option<String>,

        /// Install with classic confinement
        #[arg(long)]
        classic: bool,

        /// Install in development mode
        #[arg(long)]
        devmode: bool,

        /// Allow snaps that are not signed by the store
        #[arg(long)]
        dangerous: bool,

        /// Return as soon as snapd accepts the request
        #[arg(long)]
        no_wait: bool,
    },

    /// Remove an installed snap
    #[command(alias = "rm")]
    Remove {
        /// Snap name
        snap: String,

        /// Do not keep a snapshot of the snap's data
        #[arg(long)]
        purge: bool,

        /// Stop running apps of the snap first
        #[arg(long)]
        terminate: bool,

        /// Return as soon as snapd accepts the request
        #[arg(long)]
        no_wait: bool,
    },

    /// Refresh an installed snap
    Refresh {
        /// Snap name
        snap: String,

        /// Switch to this channel
        #[arg(long)]
        channel: Option<String>,

        /// Return as soon as snapd accepts the request
        #[arg(long)]
        no_wait: bool,
    },

    /// Follow a change until it is ready
    Watch {
        /// Change id
        change_id: String,
    },

    /// Show the current state of a change
    Change {
        /// Change id
        change_id: String,
    },

    /// Read or write snap configuration
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Query the Snap Store
    #[command(subcommand)]
    Store(StoreCommands),

    /// Download every revision of a snap with its store metadata
    Mirror {
        /// Snap name
        snap: String,

        /// Output directory; one subdirectory per revision
        dir: PathBuf,

        /// First revision to fetch
        #[arg(long, default_value_t = 1)]
        start: u64,

        /// Architecture to fetch revisions for
        #[arg(long, default_value = "amd64")]
        arch: String,
    },
}

/// Snap configuration commands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print configuration values
    Get {
        /// Snap name
        snap: String,

        /// Keys to read (all when omitted)
        keys: Vec<String>,
    },

    /// Set configuration values
    Set {
        /// Snap name
        snap: String,

        /// key=value pairs; values are parsed as JSON when possible
        #[arg(required = true, value_name = "KEY=VALUE")]
        pairs: Vec<String>,

        /// Return as soon as snapd accepts the request
        #[arg(long)]
        no_wait: bool,
    },
}

/// Snap Store commands
#[derive(Subcommand)]
pub enum StoreCommands {
    /// List store categories
    Categories {
        /// Fields to request, comma separated
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
    },

    /// Show one store category
    Category {
        /// Category name
        name: String,

        /// Fields to request, comma separated
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
    },

    /// Search the store
    #[command(alias = "find")]
    Search {
        /// Search query
        query: String,

        /// Fields to request, comma separated
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,

        /// Only snaps in this category
        #[arg(long)]
        category: Option<String>,

        /// Only snaps built for this architecture
        #[arg(long)]
        arch: Option<String>,
    },

    /// Show store metadata and channel map of a snap
    Info {
        /// Snap name
        snap: String,

        /// Fields to request, comma separated
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,

        /// Only channels for this architecture
        #[arg(long)]
        arch: Option<String>,
    },

    /// List every snap published for an architecture
    Arch {
        /// Architecture, e.g. arm64
        arch: String,
    },

    /// Show metadata of one specific revision
    Revision {
        /// Snap name
        snap: String,

        /// Revision number
        revision: u64,

        /// Architecture of the revision
        #[arg(long, default_value = "amd64")]
        arch: String,

        /// Fields to request, comma separated
        #[arg(long, value_delimiter = ',', default_value = "revision,version,download")]
        fields: Vec<String>,
    },
}
