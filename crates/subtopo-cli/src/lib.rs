pub mod cli;
pub mod config;

pub use cli::{build_cli_command, CacheCommands, Cli, Commands, OutputFormat, RunInputs};
pub use config::load_config;
