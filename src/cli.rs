use clap::Parser;

pub const DEFAULT_MAX_PAGES: usize = 5;
pub const DEFAULT_CONCURRENCY: usize = 5;
pub const DEFAULT_MIN_TEXT_LENGTH: usize = 100;
pub const DEFAULT_EXTRA_WAIT_MS: u64 = 2500;
pub const DEFAULT_PROTECTION_WAIT_SECS: u64 = 20;
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Parser, Debug, Clone)]
#[command(name = "brandscout")]
#[command(
    about = "Crawl a business website and extract brand signals (content, colors, typography)",
    long_about = None
)]
pub struct Cli {
    /// The website to analyze
    #[arg(value_name = "URL")]
    pub url: String,

    /// Maximum number of pages to accept (default: 5)
    #[arg(short, long, default_value_t = DEFAULT_MAX_PAGES)]
    pub max_pages: usize,

    /// Number of concurrent HTTP fetches (default: 5)
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Seed the crawl from sitemap.xml when available (default: true)
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub use_sitemap: bool,

    /// Use a headless browser as fallback strategy (default: true)
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub browser: bool,

    /// Path to a Chromium or Chrome executable
    #[arg(long)]
    pub chrome_path: Option<String>,

    /// Rate limit for HTTP requests per second (optional, e.g., 1.0 for 1 req/s)
    #[arg(short = 'r', long)]
    pub rate_limit: Option<f64>,

    /// HTTP request timeout in seconds (default: 15)
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Minimum body text length for a page to be kept (default: 100)
    #[arg(long, default_value_t = DEFAULT_MIN_TEXT_LENGTH)]
    pub min_text_length: usize,

    /// Extra wait after a rendered page settles, in milliseconds (default: 2500)
    #[arg(long, default_value_t = DEFAULT_EXTRA_WAIT_MS)]
    pub extra_wait_ms: u64,

    /// How long to wait for a bot challenge to clear, in seconds (default: 20)
    #[arg(long, default_value_t = DEFAULT_PROTECTION_WAIT_SECS)]
    pub protection_wait_secs: u64,

    /// Output format: text or json
    #[arg(short, long, default_value = "text")]
    pub output: String,

    /// Save the signal bundle as JSON to a file
    #[arg(short, long)]
    pub save: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Path to configuration file (JSON, TOML, or YAML)
    #[arg(long)]
    pub config: Option<String>,
}
