mod cli;
mod commands;
mod target;

use crate::cli::{Cli, Command};
use clap::Parser;
use hoist_config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level());
    let config = Config::load(cli.config.as_deref()).map_err(report)?;
    match cli.command {
        Command::Upload(args) => commands::upload(config, args).await,
        Command::Config => commands::show_config(&config),
    }
}

/// `RUST_LOG` wins over the level picked by `-v` flags.
fn init_logging(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

/// Render an error tree (with locations) as a diagnostic.
pub(crate) fn report<E>(err: exn::Exn<E>) -> miette::Report
where
    E: std::error::Error + Send + Sync + 'static,
{
    miette::miette!("{err:?}")
}
