use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands, ConfigCommands};
use commands::config::load_config;
use commands::{CommandContext, CommandError};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let error_json = serde_json::json!({
                "error": {
                    "code": e.code(),
                    "message": e.to_string(),
                }
            });
            match serde_json::to_string_pretty(&error_json) {
                Ok(rendered) => eprintln!("{}", rendered),
                Err(_) => eprintln!("Error: {e}"),
            }
            ExitCode::from(e.exit_code())
        }
    }
}

/// Logs go to stderr: `RUST_LOG` when set, else `debug` with `--verbose`,
/// else `warn`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: &Cli) -> Result<(), CommandError> {
    let ctx = CommandContext::new(cli, load_config()?);

    match &cli.command {
        Commands::List { collection, query } => {
            commands::list::execute(&ctx, collection, query).await
        }
        Commands::First { collection, query } => {
            commands::list::execute_first(&ctx, collection, query).await
        }
        Commands::Get {
            collection,
            id,
            output,
        } => commands::get::execute(&ctx, collection, id, output).await,
        Commands::Many {
            collection,
            ids,
            output,
        } => commands::get::execute_many(&ctx, collection, ids, output).await,
        Commands::Collections => commands::collections::execute(&ctx).await,
        Commands::Config { command } => match command {
            Some(ConfigCommands::Show) | None => commands::config::execute_show(&ctx),
            Some(ConfigCommands::Path) => commands::config::execute_path(),
        },
    }
}
