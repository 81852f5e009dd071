use clap::Parser;
use clap_complete::{generate, Shell};
use std::fs;
use std::io;
use std::path::Path;
use std::process::ExitCode;
use subtopo_cli::{build_cli_command, Cli, Commands};
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

mod commands;

use commands::util::configure_threads;

fn generate_completions(shell: Shell, out: Option<&Path>) -> anyhow::Result<()> {
    let mut cmd = build_cli_command();
    if let Some(path) = out {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(path)?;
        generate(shell, &mut cmd, "subtopo", &mut file);
        println!("Wrote {shell:?} completion to {}", path.display());
    } else {
        generate(shell, &mut cmd, "subtopo", &mut io::stdout());
    }
    Ok(())
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Some(Commands::Reconcile {
            inputs,
            out,
            history_out,
            no_check,
            format,
        }) => {
            info!(
                "Reconciling {} against {}",
                inputs.history.display(),
                inputs.network.display()
            );
            commands::reconcile::handle(inputs, out, history_out.as_deref(), *no_check, *format)
        }
        Some(Commands::Clean {
            inputs,
            out,
            format,
        }) => {
            info!("Cleaning {}", inputs.history.display());
            commands::clean::handle(inputs, out, *format)
        }
        Some(Commands::Inspect { history, format }) => commands::inspect::handle(history, *format),
        Some(Commands::Cache { command }) => commands::cache::handle(command),
        Some(Commands::Completions { shell, out }) => generate_completions(*shell, out.as_deref()),
        None => {
            info!("No subcommand provided. Use `subtopo --help` for more information.");
            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(io::stderr)
        .finish();
    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {err}");
    }

    configure_threads(&cli.threads);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Command failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
