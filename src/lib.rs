pub mod classifier;
pub mod cli;
pub mod colors;
pub mod config;
pub mod crawler;
pub mod error;
pub mod fetcher;
pub mod frontier;
pub mod http_client;
pub mod models;
pub mod page_parser;
pub mod palette;
pub mod pipeline;
pub mod protection;
pub mod renderer;
pub mod reporter;
pub mod sitemap;
pub mod typography;

use anyhow::Result;
use cli::Cli;
use colored::*;
use pipeline::{Pipeline, PipelineConfig};
use reporter::Reporter;

pub async fn run(args: Cli) -> Result<()> {
    // Validate URL
    if !args.url.starts_with("http://") && !args.url.starts_with("https://") {
        anyhow::bail!("URL must start with http:// or https://");
    }
    if !matches!(args.output.as_str(), "text" | "json") {
        anyhow::bail!("Output format must be 'text' or 'json'");
    }

    let json_output = args.output == "json";
    if !json_output {
        println!(
            "{}",
            "Brandscout - Website Brand Signal Extractor"
                .bright_cyan()
                .bold()
        );
        println!("{}", "=".repeat(50).bright_blue());
        println!("{} {}", "Analyzing:".bright_white().bold(), args.url);
        println!("{} {}", "Max pages:".bright_white().bold(), args.max_pages);
        println!();
    }

    let pipeline = Pipeline::new(PipelineConfig::from(&args)).await?;
    if !json_output && !pipeline.browser_available() {
        println!(
            "{}",
            "Headless browser unavailable, using plain HTTP only".yellow()
        );
    }

    let bundle = pipeline.run(&args.url).await?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&bundle)?);
    } else {
        Reporter::print_text_report(&bundle);
    }

    if let Some(filename) = args.save {
        Reporter::save_json_report(&bundle, &filename)?;
    }

    Ok(())
}
