use anyhow::Result;
use brandscout::cli::Cli;
use brandscout::config::Config;
use brandscout::run;
use clap::Parser;
use colored::*;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = match load_config(&cli) {
        Ok(Some(config)) => config.merge_with_cli(&cli),
        Ok(None) => cli,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".bright_red().bold(), e);
            std::process::exit(1);
        }
    };

    let default_level = if args.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("brandscout={default_level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args).await {
        eprintln!("{} {:#}", "Error:".bright_red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Option<Config>> {
    match &cli.config {
        Some(path) => Config::from_file(Path::new(path)).map(Some),
        None => Config::from_default_paths(),
    }
}
