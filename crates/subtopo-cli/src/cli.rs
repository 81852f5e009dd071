use clap::{CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "subtopo", author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    /// Worker threads for the builder (`auto` or a number)
    #[arg(long, default_value = "auto", global = true)]
    pub threads: String,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Inputs shared by the commands that run against a reference network
#[derive(clap::Args, Debug, Clone)]
pub struct RunInputs {
    /// Reference network (JSON)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub network: PathBuf,

    /// Topology history (JSON)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub history: PathBuf,

    /// Reconciliation settings (TOML)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Short aliases used when logging equipment ids (JSON object)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub short_ids: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Clean a history, derive the unique topology, apply it and check it
    Reconcile {
        #[command(flatten)]
        inputs: RunInputs,

        /// Where to write the reconciled network
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: PathBuf,

        /// Where to write the cleaned history with switch states
        #[arg(long, value_hint = ValueHint::FilePath)]
        history_out: Option<PathBuf>,

        /// Skip replaying the history after applying
        #[arg(long)]
        no_check: bool,

        /// Summary format
        #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,
    },
    /// Clean a history against a reference network
    Clean {
        #[command(flatten)]
        inputs: RunInputs,

        /// Where to write the cleaned history
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: PathBuf,

        /// Report format
        #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,
    },
    /// Print history statistics
    Inspect {
        /// Topology history (JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        history: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Plain)]
        format: OutputFormat,
    },
    /// History cache helpers
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
        /// Write output to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Print the cache key of a history
    Key {
        #[arg(value_hint = ValueHint::FilePath)]
        history: PathBuf,
    },
    /// Store a history in the cache
    Store {
        #[arg(value_hint = ValueHint::FilePath)]
        history: PathBuf,
        /// Cache root (defaults to the user cache directory)
        #[arg(long, value_hint = ValueHint::DirPath)]
        root: Option<PathBuf>,
    },
    /// Copy a cached history out of the cache
    Load {
        key: String,
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: PathBuf,
        /// Cache root (defaults to the user cache directory)
        #[arg(long, value_hint = ValueHint::DirPath)]
        root: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Plain,
    Json,
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
