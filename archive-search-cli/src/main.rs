mod cli;
mod commands;
mod context;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::commands::{collate, rebuild, search};

fn main() -> Result<()> {
    // Library logs go through the `log` facade and are bridged here.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = cli.format;
    let config = cli.config.as_deref();
    let store = cli.store.as_path();

    match cli.command {
        Command::Rebuild(cmd) => rebuild::run(cmd, config, store, format),
        Command::Search(cmd) => search::run(cmd, config, store, format),
        Command::Languages(cmd) => search::run_languages(cmd, config, store, format),
        Command::Collate(cmd) => collate::run(cmd, config, store, format),
        Command::Config => {
            let config = context::load_config(config)?;
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
