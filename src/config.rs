use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::{
    Cli, DEFAULT_CONCURRENCY, DEFAULT_EXTRA_WAIT_MS, DEFAULT_MAX_PAGES, DEFAULT_MIN_TEXT_LENGTH,
    DEFAULT_PROTECTION_WAIT_SECS, DEFAULT_TIMEOUT_SECS,
};
use crate::crawler::CrawlerConfig;
use crate::fetcher::HttpConfig;
use crate::pipeline::PipelineConfig;
use crate::renderer::RenderOptions;

/// Configuration file structure that mirrors CLI options.
/// The target URL always comes from the command line.
/// All fields are optional to allow partial configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub max_pages: Option<usize>,
    pub concurrency: Option<usize>,
    pub use_sitemap: Option<bool>,
    pub browser: Option<bool>,
    pub chrome_path: Option<String>,
    pub rate_limit: Option<f64>,
    pub timeout: Option<u64>,
    pub min_text_length: Option<usize>,
    pub extra_wait_ms: Option<u64>,
    pub protection_wait_secs: Option<u64>,
    pub output: Option<String>,
    pub save: Option<String>,
    pub verbose: Option<bool>,
}

/// Configuration file format based on file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
    Yaml,
}

impl ConfigFormat {
    const ALL: [ConfigFormat; 3] = [ConfigFormat::Json, ConfigFormat::Toml, ConfigFormat::Yaml];

    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                "toml" => Some(ConfigFormat::Toml),
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                _ => None,
            })
    }

    pub fn extensions(&self) -> &[&str] {
        match self {
            ConfigFormat::Json => &["json"],
            ConfigFormat::Toml => &["toml"],
            ConfigFormat::Yaml => &["yaml", "yml"],
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let format = ConfigFormat::from_path(path)
            .with_context(|| format!("Unsupported config file format: {}", path.display()))?;

        let config = match format {
            ConfigFormat::Json => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?,
            ConfigFormat::Toml => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?,
            ConfigFormat::Yaml => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?,
        };

        Ok(config)
    }

    /// Candidate files in lookup order: `brandscout.*` in the working
    /// directory, then `config.*` under `$XDG_CONFIG_HOME/brandscout` (or
    /// `~/.config/brandscout`).
    pub fn default_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        for format in &ConfigFormat::ALL {
            for ext in format.extensions() {
                paths.push(PathBuf::from(format!("brandscout.{}", ext)));
            }
        }

        let config_home = std::env::var("XDG_CONFIG_HOME")
            .ok()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")));

        if let Some(config_home) = config_home {
            let app_dir = config_home.join("brandscout");
            for format in &ConfigFormat::ALL {
                for ext in format.extensions() {
                    paths.push(app_dir.join(format!("config.{}", ext)));
                }
            }
        }

        paths
    }

    /// Returns the first configuration file found, or None if no config exists
    pub fn from_default_paths() -> Result<Option<Self>> {
        for path in Self::default_paths() {
            if path.exists() {
                tracing::debug!(path = %path.display(), "Loading config file");
                return Ok(Some(Self::from_file(&path)?));
            }
        }
        Ok(None)
    }

    /// CLI values that differ from their defaults win over file values.
    pub fn merge_with_cli(&self, cli: &Cli) -> Cli {
        fn pick<T: PartialEq + Clone>(cli: &T, default: T, file: &Option<T>) -> T {
            if *cli != default {
                cli.clone()
            } else {
                file.clone().unwrap_or(default)
            }
        }

        Cli {
            url: cli.url.clone(),
            max_pages: pick(&cli.max_pages, DEFAULT_MAX_PAGES, &self.max_pages),
            concurrency: pick(&cli.concurrency, DEFAULT_CONCURRENCY, &self.concurrency),
            use_sitemap: pick(&cli.use_sitemap, true, &self.use_sitemap),
            browser: pick(&cli.browser, true, &self.browser),
            chrome_path: cli.chrome_path.clone().or_else(|| self.chrome_path.clone()),
            rate_limit: cli.rate_limit.or(self.rate_limit),
            timeout: pick(&cli.timeout, DEFAULT_TIMEOUT_SECS, &self.timeout),
            min_text_length: pick(
                &cli.min_text_length,
                DEFAULT_MIN_TEXT_LENGTH,
                &self.min_text_length,
            ),
            extra_wait_ms: pick(&cli.extra_wait_ms, DEFAULT_EXTRA_WAIT_MS, &self.extra_wait_ms),
            protection_wait_secs: pick(
                &cli.protection_wait_secs,
                DEFAULT_PROTECTION_WAIT_SECS,
                &self.protection_wait_secs,
            ),
            output: pick(&cli.output, "text".to_string(), &self.output),
            save: cli.save.clone().or_else(|| self.save.clone()),
            verbose: cli.verbose || self.verbose.unwrap_or(false),
            config: cli.config.clone(),
        }
    }
}

impl From<&Cli> for PipelineConfig {
    fn from(cli: &Cli) -> Self {
        PipelineConfig {
            crawler: CrawlerConfig {
                max_pages: cli.max_pages,
                concurrency: cli.concurrency,
                use_sitemap: cli.use_sitemap,
                min_text_length: cli.min_text_length,
            },
            http: HttpConfig {
                timeout_secs: cli.timeout,
                requests_per_second: cli.rate_limit,
            },
            render: RenderOptions {
                extra_wait: Duration::from_millis(cli.extra_wait_ms),
                protection_wait: Duration::from_secs(cli.protection_wait_secs),
                ..RenderOptions::default()
            },
            use_browser: cli.browser,
            chrome_path: cli.chrome_path.clone(),
            show_progress: !cli.verbose && cli.output != "json",
        }
    }
}
