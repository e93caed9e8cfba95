//! End-to-end run: crawl, extract, aggregate into a [`SignalBundle`].

use crate::colors::{ColorExtractor, MarkupColorExtractor, resolve_candidates};
use crate::crawler::{Crawler, CrawlerConfig};
use crate::fetcher::{HttpConfig, HttpFetcher};
use crate::models::{CrawlResult, PageSummary, PageType, SignalBundle};
use crate::page_parser::truncate_chars;
use crate::palette::assign_roles;
use crate::renderer::{BrowserEngine, RenderCapability, RenderOptions, RenderedFetcher};
use crate::typography::{CssFontExtractor, FontExtractor, merge_typography};
use anyhow::Result;
use std::collections::HashSet;

pub const MAX_COMBINED_TEXT_CHARS: usize = 5000;
pub const TEXT_PREVIEW_CHARS: usize = 300;
pub const MAX_IMAGE_URLS: usize = 10;
const IMAGES_PER_PAGE: usize = 3;

/// Separators that end the brand part of a page title.
const TITLE_SEPARATORS: &[&str] = &["|", " - ", "—"];

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub crawler: CrawlerConfig,
    pub http: HttpConfig,
    pub render: RenderOptions,
    /// Try to start a browser for the rendered strategy.
    pub use_browser: bool,
    pub chrome_path: Option<String>,
    pub show_progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            crawler: CrawlerConfig::default(),
            http: HttpConfig::default(),
            render: RenderOptions::default(),
            use_browser: true,
            chrome_path: None,
            show_progress: false,
        }
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    http: HttpFetcher,
    capability: RenderCapability,
    colors: Box<dyn ColorExtractor>,
    fonts: Box<dyn FontExtractor>,
}

impl Pipeline {
    /// Builds the pipeline and negotiates the browser capability once.
    ///
    /// A browser that cannot be started is not an error: the run continues
    /// with the lightweight strategy only.
    pub async fn new(config: PipelineConfig) -> Result<Self> {
        let capability = if !config.use_browser {
            RenderCapability::Unavailable("disabled by configuration".to_string())
        } else {
            match RenderedFetcher::launch_chromium(
                config.chrome_path.as_deref(),
                config.render.clone(),
            )
            .await
            {
                Ok(fetcher) => {
                    tracing::info!("Browser strategy available");
                    RenderCapability::Available(fetcher)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Browser strategy unavailable, continuing without it");
                    RenderCapability::Unavailable(e.to_string())
                }
            }
        };

        Self::with_capability(config, capability)
    }

    /// Uses `engine` for the rendered strategy instead of launching Chromium.
    pub fn with_engine(config: PipelineConfig, engine: Box<dyn BrowserEngine>) -> Result<Self> {
        let fetcher = RenderedFetcher::spawn(engine, config.render.clone());
        Self::with_capability(config, RenderCapability::Available(fetcher))
    }

    pub fn with_capability(config: PipelineConfig, capability: RenderCapability) -> Result<Self> {
        Ok(Self {
            http: HttpFetcher::new(&config.http)?,
            config,
            capability,
            colors: Box::new(MarkupColorExtractor),
            fonts: Box::new(CssFontExtractor),
        })
    }

    pub fn with_color_extractor(mut self, extractor: Box<dyn ColorExtractor>) -> Self {
        self.colors = extractor;
        self
    }

    pub fn with_font_extractor(mut self, extractor: Box<dyn FontExtractor>) -> Self {
        self.fonts = extractor;
        self
    }

    pub fn browser_available(&self) -> bool {
        self.capability.fetcher().is_some()
    }

    /// Crawls `seed_url` and aggregates the signals. The browser, if any, is
    /// closed before this returns, whatever the outcome.
    pub async fn run(self, seed_url: &str) -> Result<SignalBundle> {
        let result = self.collect(seed_url).await;
        self.capability.shutdown().await;
        result
    }

    async fn collect(&self, seed_url: &str) -> Result<SignalBundle> {
        let mut crawler = Crawler::new(
            seed_url,
            self.config.crawler.clone(),
            &self.http,
            self.capability.fetcher(),
        )?;
        if self.config.show_progress {
            crawler.enable_progress_bar();
        }

        let crawl = crawler.crawl().await;
        Ok(build_bundle(
            seed_url,
            crawl,
            self.colors.as_ref(),
            self.fonts.as_ref(),
        ))
    }
}

/// Aggregates a crawl into the bundle. Extraction problems on a page only
/// leave that page's signals empty.
pub fn build_bundle(
    seed_url: &str,
    crawl: CrawlResult,
    colors: &dyn ColorExtractor,
    fonts: &dyn FontExtractor,
) -> SignalBundle {
    let CrawlResult {
        pages,
        visited_urls,
        discovered_but_unvisited,
    } = crawl;

    if pages.is_empty() {
        tracing::warn!(seed = %seed_url, "No pages accepted, producing an empty bundle");
    }

    let candidates = pages
        .iter()
        .flat_map(|page| colors.extract_colors(&page.raw_html, page.computed_style_hints.as_ref()))
        .collect();
    let colors = resolve_candidates(candidates);
    let palette = assign_roles(&colors);

    let per_page_fonts: Vec<_> = pages
        .iter()
        .map(|page| {
            let computed = page.computed_style_hints.as_ref().map(|h| &h.fonts);
            fonts.extract_fonts(&page.raw_html, computed)
        })
        .collect();
    let typography = merge_typography(&per_page_fonts);

    let combined_text = truncate_chars(
        &pages
            .iter()
            .map(|p| p.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n"),
        MAX_COMBINED_TEXT_CHARS,
    );

    let titles = pages
        .iter()
        .filter(|p| !p.title.is_empty())
        .map(|p| p.title.clone())
        .collect();
    let descriptions = pages
        .iter()
        .filter(|p| !p.description.is_empty())
        .map(|p| p.description.clone())
        .collect();

    let mut seen_images = HashSet::new();
    let image_urls = pages
        .iter()
        .flat_map(|p| p.images.iter().take(IMAGES_PER_PAGE))
        .map(|img| img.url.clone())
        .filter(|url| seen_images.insert(url.clone()))
        .take(MAX_IMAGE_URLS)
        .collect();

    let page_summaries = pages
        .iter()
        .map(|p| PageSummary {
            url: p.url.clone(),
            page_type: p.page_type,
            title: p.title.clone(),
            description: p.description.clone(),
            text_preview: truncate_chars(&p.text, TEXT_PREVIEW_CHARS),
        })
        .collect();

    let brand_name_hint = pages
        .iter()
        .find(|p| p.page_type == PageType::Homepage)
        .or_else(|| pages.first())
        .and_then(|p| brand_name_hint(&p.title));

    tracing::info!(
        pages = pages.len(),
        colors = colors.len(),
        fonts = typography.font_families.len(),
        "Signal bundle ready"
    );

    SignalBundle {
        seed_url: seed_url.to_string(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        degraded: pages.is_empty(),
        pages,
        page_summaries,
        colors,
        palette,
        typography,
        combined_text,
        titles,
        descriptions,
        image_urls,
        brand_name_hint,
        visited_urls,
        unvisited_urls: discovered_but_unvisited,
    }
}

/// The part of a title before its first separator, e.g. `Acme` for
/// `Acme | Rockets since 1949`.
pub fn brand_name_hint(title: &str) -> Option<String> {
    let cut = TITLE_SEPARATORS
        .iter()
        .filter_map(|sep| title.find(sep))
        .min()
        .unwrap_or(title.len());
    let name = title[..cut].trim();
    (!name.is_empty()).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ColorSource, ComputedFonts, ComputedStyleHints, ImageRef, PageRecord,
    };
    use std::collections::BTreeSet;

    fn page(url: &str, page_type: PageType, title: &str, html: &str) -> PageRecord {
        PageRecord {
            url: url.to_string(),
            title: title.to_string(),
            description: format!("{title} description"),
            text: format!("{title} body text"),
            images: (0..5)
                .map(|i| ImageRef {
                    url: format!("{url}/img{i}.png"),
                    alt: String::new(),
                })
                .collect(),
            links: vec![],
            raw_html: html.to_string(),
            page_type,
            computed_style_hints: None,
        }
    }

    #[test]
    fn test_brand_name_hint() {
        assert_eq!(brand_name_hint("Acme | Rockets"), Some("Acme".to_string()));
        assert_eq!(brand_name_hint("Acme Corp - Home"), Some("Acme Corp".to_string()));
        assert_eq!(brand_name_hint("Acme — Since 1949"), Some("Acme".to_string()));
        assert_eq!(brand_name_hint("Self-Storage Co"), Some("Self-Storage Co".to_string()));
        assert_eq!(brand_name_hint("  | nothing"), None);
        assert_eq!(brand_name_hint(""), None);
    }

    #[test]
    fn test_empty_crawl_is_degraded() {
        let bundle = build_bundle(
            "https://acme.com",
            CrawlResult::default(),
            &MarkupColorExtractor,
            &CssFontExtractor,
        );
        assert!(bundle.degraded);
        assert!(bundle.pages.is_empty());
        assert!(bundle.colors.is_empty());
        assert_eq!(bundle.palette, Default::default());
        assert!(bundle.combined_text.is_empty());
        assert!(bundle.brand_name_hint.is_none());
    }

    #[test]
    fn test_bundle_aggregates_pages() {
        let mut home = page(
            "https://acme.com/",
            PageType::Homepage,
            "Acme | Home",
            r#"<style>.btn { background: #E4002B; font-family: Inter, sans-serif; }</style>"#,
        );
        home.computed_style_hints = Some(ComputedStyleHints {
            background_color: Some("rgb(255, 255, 255)".to_string()),
            fonts: ComputedFonts {
                body: Some("Inter, sans-serif".to_string()),
                h1: Some("Lora, serif".to_string()),
            },
            ..Default::default()
        });
        let about = page(
            "https://acme.com/about",
            PageType::About,
            "About Acme",
            r#"<p style="color: #e4002b; font-family: Lato">x</p><style>p { color: #1F3A93; }</style>"#,
        );

        let crawl = CrawlResult {
            pages: vec![home, about],
            visited_urls: BTreeSet::from(["https://acme.com/".to_string()]),
            discovered_but_unvisited: BTreeSet::from(["https://acme.com/blog".to_string()]),
        };

        let bundle = build_bundle(
            "https://acme.com",
            crawl,
            &MarkupColorExtractor,
            &CssFontExtractor,
        );

        assert!(!bundle.degraded);
        assert_eq!(bundle.brand_name_hint.as_deref(), Some("Acme"));
        assert_eq!(bundle.titles, vec!["Acme | Home", "About Acme"]);
        assert_eq!(bundle.descriptions.len(), 2);
        assert_eq!(bundle.image_urls.len(), 6);
        assert_eq!(bundle.page_summaries[1].page_type, PageType::About);
        assert_eq!(
            bundle.combined_text,
            "Acme | Home body text\n\nAbout Acme body text"
        );
        assert!(bundle.unvisited_urls.contains("https://acme.com/blog"));

        let red: Vec<_> = bundle.colors.iter().filter(|c| c.hex == "#E4002B").collect();
        assert_eq!(red.len(), 1);
        assert_eq!(red[0].source, ColorSource::BrandCssRule);
        assert_eq!(bundle.palette.background.as_ref().unwrap().hex, "#FFFFFF");
        assert_eq!(bundle.palette.primary.as_ref().unwrap().hex, "#E4002B");

        assert_eq!(bundle.typography.primary_font.as_deref(), Some("Inter"));
        assert_eq!(bundle.typography.secondary_font.as_deref(), Some("Lora"));
        assert!(bundle.typography.font_families.contains(&"Lato".to_string()));
    }

    #[test]
    fn test_combined_text_is_bounded() {
        let mut pages = Vec::new();
        for i in 0..3 {
            let mut p = page(&format!("https://acme.com/{i}"), PageType::Other, "T", "");
            p.text = "x".repeat(3000);
            pages.push(p);
        }
        let crawl = CrawlResult {
            pages,
            ..Default::default()
        };
        let bundle = build_bundle("https://acme.com", crawl, &MarkupColorExtractor, &CssFontExtractor);
        assert_eq!(bundle.combined_text.chars().count(), MAX_COMBINED_TEXT_CHARS);
        assert_eq!(bundle.image_urls.len(), 9);
        assert_eq!(bundle.page_summaries[0].text_preview.chars().count(), TEXT_PREVIEW_CHARS);
    }
}
