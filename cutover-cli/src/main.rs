//! `dns-cutover` entry point.
//!
//! Logs go to stderr; stdout carries the JSON results so they can be piped.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Command};
use commands::ExecuteArgs;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .without_time()
                .with_ansi(false),
        )
        .with(EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    let result = match cli.command {
        Command::Validate { plan } => commands::validate(&plan).await,
        Command::Execute {
            run,
            provider,
            dry_run,
            manual,
            skip_pre_check,
            timeout,
            post_check_interval,
            quorum,
        } => {
            let args = ExecuteArgs {
                dry_run,
                manual,
                skip_pre_check,
                timeout,
                post_check_interval,
                quorum,
                verbose: cli.verbose,
            };
            commands::execute(&run, &provider, &args).await
        }
        Command::Rollback {
            run,
            provider,
            dry_run,
        } => commands::rollback(&run, &provider, dry_run, cli.verbose).await,
        Command::Providers => commands::providers(),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
