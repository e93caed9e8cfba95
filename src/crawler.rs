use crate::classifier::classify;
use crate::error::FetchError;
use crate::fetcher::HttpFetcher;
use crate::frontier::{Frontier, canonical_url, normalize_url};
use crate::models::{CrawlResult, PageRecord, PageType};
use crate::protection::is_protection_page;
use crate::renderer::{RenderedFetcher, WaitMode};
use crate::sitemap::discover_sitemap_urls;
use anyhow::{Context, Result, anyhow};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::{BTreeSet, HashMap, HashSet};
use url::Url;

/// Conventional paths probed when the site has no usable sitemap.
pub const COMMON_PATHS: &[&str] = &[
    "/about",
    "/products",
    "/services",
    "/blog",
    "/about-us",
    "/news",
    "/shop",
    "/company",
];

/// Sitemap seeding takes up to this many URLs per requested page.
const SITEMAP_SEED_FACTOR: usize = 2;

/// Configuration for the crawler
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub max_pages: usize,
    pub concurrency: usize,
    pub use_sitemap: bool,
    /// Accepted pages need at least this many characters of body text.
    pub min_text_length: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_pages: 5,
            concurrency: 5,
            use_sitemap: true,
            min_text_length: 100,
        }
    }
}

type BatchOutcome = (u64, String, Result<PageRecord, FetchError>);

/// Prioritized, bounded traversal of one site.
///
/// The crawler is the only owner of the frontier and the visited set: workers
/// return their results here and never touch shared state.
pub struct Crawler<'a> {
    base_url: Url,
    homepage: String,
    config: CrawlerConfig,
    http: &'a HttpFetcher,
    rendered: Option<&'a RenderedFetcher>,
    frontier: Frontier,
    visited: HashSet<String>,
    seeds: Vec<String>,
    /// Accepted pages tagged with the order they were scheduled in.
    accepted: Vec<(u64, PageRecord)>,
    next_seq: u64,
    rendered_only: bool,
    rendered_tried: bool,
    progress_bar: Option<ProgressBar>,
}

impl<'a> Crawler<'a> {
    pub fn new(
        start_url: &str,
        config: CrawlerConfig,
        http: &'a HttpFetcher,
        rendered: Option<&'a RenderedFetcher>,
    ) -> Result<Self> {
        let base_url = Url::parse(start_url).context("Invalid URL")?;

        // Validate URL scheme - only allow http and https
        match base_url.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(anyhow!(
                    "Invalid URL scheme '{}': only http and https are supported",
                    scheme
                ));
            }
        }
        if config.max_pages == 0 {
            return Err(anyhow!("max_pages must be at least 1"));
        }

        let homepage = normalize_url(&base_url.join("/").context("Invalid URL")?);

        Ok(Self {
            base_url,
            homepage,
            config,
            http,
            rendered,
            frontier: Frontier::new(),
            visited: HashSet::new(),
            seeds: Vec::new(),
            accepted: Vec::new(),
            next_seq: 0,
            rendered_only: false,
            rendered_tried: false,
            progress_bar: None,
        })
    }

    /// Enable progress bar for crawling
    pub fn enable_progress_bar(&mut self) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("[{elapsed_precise}] {spinner:.cyan} Crawling: {pos} pages accepted")
                .expect("Progress bar template should be valid"),
        );
        self.progress_bar = Some(pb);
    }

    /// Runs the crawl to completion. Never fails: a site that yields nothing
    /// comes back as an empty result.
    pub async fn crawl(&mut self) -> CrawlResult {
        if let Some(ref pb) = self.progress_bar {
            pb.set_position(0);
        }

        self.seed().await;
        self.drain_frontier().await;

        if self.accepted.is_empty() && !self.rendered_tried && self.rendered.is_some() {
            tracing::warn!(
                base = %self.base_url,
                "No page accepted over HTTP, retrying seeds in the browser"
            );
            self.rendered_only = true;
            for url in self.seeds.clone() {
                self.visited.remove(&url);
                self.frontier.push_back(url);
            }
            self.drain_frontier().await;
        }

        if let Some(ref pb) = self.progress_bar {
            pb.finish_with_message(format!("Accepted {} pages", self.accepted.len()));
        }

        self.finish()
    }

    async fn seed(&mut self) {
        let mut urls = Vec::new();
        if self.config.use_sitemap {
            let limit = self.config.max_pages * SITEMAP_SEED_FACTOR;
            urls = discover_sitemap_urls(self.http, &self.base_url, limit)
                .await
                .iter()
                .filter_map(|url| canonical_url(&self.base_url, url))
                .collect();
            urls.sort_by_key(|url| classify(url, None, None).priority());
        }

        if urls.is_empty() {
            urls = COMMON_PATHS
                .iter()
                .filter_map(|path| self.base_url.join(path).ok())
                .map(|url| normalize_url(&url))
                .collect();
            tracing::debug!(count = urls.len(), "Seeding from conventional paths");
        }

        for url in urls {
            self.frontier.push_back(url);
        }
        let start = normalize_url(&self.base_url);
        if start != self.homepage {
            self.frontier.promote(start);
        }
        self.frontier.promote(self.homepage.clone());

        self.seeds = self.frontier.remaining().cloned().collect();
        tracing::info!(seeds = self.seeds.len(), "Frontier seeded");
    }

    async fn drain_frontier(&mut self) {
        while self.accepted.len() < self.config.max_pages && !self.frontier.is_empty() {
            let batch = self.next_batch();
            if batch.is_empty() {
                break;
            }

            if self.rendered_only && self.rendered.is_some() {
                self.render_batch(&batch, WaitMode::Standard).await;
            } else {
                let results = self.fetch_batch(&batch).await;
                let all_failed = results.iter().all(|(_, _, r)| r.is_err());
                let blocked = results
                    .iter()
                    .filter(|(_, _, r)| r.as_ref().is_err_and(FetchError::looks_blocked))
                    .count();

                self.process_results(results).await;

                if all_failed && self.rendered.is_some() {
                    tracing::warn!(
                        batch = batch.len(),
                        blocked,
                        "Whole batch failed over HTTP, retrying it in the browser"
                    );
                    for (_, url) in &batch {
                        self.visited.remove(url);
                    }
                    let before = self.accepted.len();
                    self.render_batch(&batch, WaitMode::Standard).await;
                    if self.accepted.len() > before {
                        tracing::info!("Browser fallback worked, staying on it for this run");
                        self.rendered_only = true;
                    }
                }
            }

            if let Some(ref pb) = self.progress_bar {
                pb.set_position(self.accepted.len() as u64);
            }
        }
    }

    /// Pops up to `min(concurrency, remaining budget)` unvisited URLs and
    /// marks them visited.
    fn next_batch(&mut self) -> Vec<(u64, String)> {
        let budget = self.config.max_pages - self.accepted.len();
        let size = self.config.concurrency.max(1).min(budget);

        let mut batch = Vec::with_capacity(size);
        while batch.len() < size {
            let Some(url) = self.frontier.pop_front() else {
                break;
            };
            if !self.visited.insert(url.clone()) {
                continue;
            }
            batch.push((self.next_seq, url));
            self.next_seq += 1;
        }
        batch
    }

    async fn fetch_batch(&self, batch: &[(u64, String)]) -> Vec<BatchOutcome> {
        let http = self.http;
        let mut results: Vec<BatchOutcome> = stream::iter(batch.iter().cloned())
            .map(|(seq, url)| async move {
                let result = http.fetch(&url).await;
                (seq, url, result)
            })
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        // Completion order is racy; handle results in schedule order.
        results.sort_by_key(|(seq, _, _)| *seq);
        results
    }

    async fn process_results(&mut self, results: Vec<BatchOutcome>) {
        for (seq, url, result) in results {
            match result {
                Ok(page) if is_protection_page(&page.title, &page.text) => {
                    tracing::info!(url = %url, "Protection page over HTTP, retrying in the browser");
                    if let Some(page) = self.render(&url, WaitMode::SuspectedProtection).await {
                        self.accept(seq, page);
                    } else {
                        tracing::warn!(url = %url, "Discarding protected page");
                    }
                }
                Ok(page) => {
                    self.accept(seq, page);
                }
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "Failed to fetch page");
                }
            }
        }
    }

    async fn render_batch(&mut self, batch: &[(u64, String)], mode: WaitMode) {
        for (seq, url) in batch {
            if self.accepted.len() >= self.config.max_pages {
                break;
            }
            self.visited.insert(url.clone());
            if let Some(page) = self.render(url, mode).await {
                self.accept(*seq, page);
            }
        }
    }

    /// One rendered fetch. A capability failure disables the browser for the
    /// rest of the run.
    async fn render(&mut self, url: &str, mode: WaitMode) -> Option<PageRecord> {
        let renderer = self.rendered?;
        self.rendered_tried = true;

        match renderer.fetch(url, mode).await {
            Ok(page) => Some(page),
            Err(e) if e.is_capability_failure() => {
                tracing::error!(error = %e, "Browser stopped working, disabling it for this run");
                self.rendered = None;
                self.rendered_only = false;
                None
            }
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Rendered fetch failed");
                None
            }
        }
    }

    /// Applies the acceptance filter and, while the budget allows, queues the
    /// page's links.
    ///
    /// The page is keyed by where it was actually served from, so redirect
    /// aliases of an accepted page are rejected.
    fn accept(&mut self, seq: u64, mut page: PageRecord) -> bool {
        if let Some(url) = canonical_url(&self.base_url, &page.url) {
            page.url = url;
        }
        self.visited.insert(page.url.clone());

        if self.accepted.len() >= self.config.max_pages {
            return false;
        }
        if self.accepted.iter().any(|(_, seen)| seen.url == page.url) {
            tracing::debug!(url = %page.url, "Rejected: already accepted under another address");
            return false;
        }
        if page.title.trim().is_empty() {
            tracing::debug!(url = %page.url, "Rejected: no title");
            return false;
        }
        if is_protection_page(&page.title, &page.text) {
            tracing::debug!(url = %page.url, "Rejected: protection page");
            return false;
        }
        let text_len = page.text.chars().count();
        if text_len < self.config.min_text_length {
            tracing::debug!(url = %page.url, text_len, "Rejected: too little text");
            return false;
        }

        if self.accepted.len() < self.config.max_pages.saturating_sub(1) {
            self.discover_links(&page);
        }

        tracing::info!(url = %page.url, page_type = page.page_type.as_str(), "Accepted page");
        self.accepted.push((seq, page));
        true
    }

    fn discover_links(&mut self, page: &PageRecord) {
        for link in &page.links {
            let Some(link) = canonical_url(&self.base_url, link) else {
                continue;
            };
            if self.visited.contains(&link) || self.frontier.contains(&link) {
                continue;
            }
            if classify(&link, None, None).is_high_value() {
                self.frontier.push_front(link);
            } else {
                self.frontier.push_back(link);
            }
        }
    }

    fn finish(&mut self) -> CrawlResult {
        let pages = order_pages(std::mem::take(&mut self.accepted), self.config.max_pages);
        let visited_urls: BTreeSet<String> = self.visited.iter().cloned().collect();
        let discovered_but_unvisited = self
            .frontier
            .remaining()
            .filter(|url| !visited_urls.contains(*url))
            .cloned()
            .collect();

        tracing::info!(
            accepted = pages.len(),
            visited = visited_urls.len(),
            "Crawl finished"
        );

        CrawlResult {
            pages,
            visited_urls,
            discovered_but_unvisited,
        }
    }
}

/// Pages kept per type before the rest are demoted.
fn group_cap(page_type: PageType) -> usize {
    match page_type {
        PageType::Homepage => 1,
        PageType::About | PageType::Products | PageType::Blog => 2,
        PageType::Other => usize::MAX,
    }
}

/// Orders by page-type priority (schedule order within a type), keeps each
/// group within its cap, appends the overflow and cuts at `max_pages`.
pub fn order_pages(mut pages: Vec<(u64, PageRecord)>, max_pages: usize) -> Vec<PageRecord> {
    pages.sort_by_key(|(seq, page)| (page.page_type.priority(), *seq));

    let mut per_type: HashMap<PageType, usize> = HashMap::new();
    let mut kept = Vec::with_capacity(pages.len());
    let mut overflow = Vec::new();
    for (_, page) in pages {
        let count = per_type.entry(page.page_type).or_default();
        *count += 1;
        if *count <= group_cap(page.page_type) {
            kept.push(page);
        } else {
            overflow.push(page);
        }
    }

    kept.extend(overflow);
    kept.truncate(max_pages);
    kept
}
