use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Coarse page category used for traversal priority and final ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageType {
    Homepage,
    About,
    Products,
    Blog,
    Other,
}

impl PageType {
    /// Lower is more important.
    pub fn priority(self) -> u8 {
        match self {
            PageType::Homepage => 0,
            PageType::About => 1,
            PageType::Products => 2,
            PageType::Blog => 3,
            PageType::Other => 4,
        }
    }

    /// Page types whose discovered links jump to the front of the frontier.
    pub fn is_high_value(self) -> bool {
        !matches!(self, PageType::Other)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PageType::Homepage => "homepage",
            PageType::About => "about",
            PageType::Products => "products",
            PageType::Blog => "blog",
            PageType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    pub alt: String,
}

/// Resolved fonts read from the browser for `body` and the first `h1`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedFonts {
    pub body: Option<String>,
    pub h1: Option<String>,
}

/// Values only a rendering browser can report.
///
/// `key_colors` is keyed by element role (`button`, `link`, `header`) and
/// holds raw CSS color strings such as `rgb(12, 34, 56)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputedStyleHints {
    pub background_color: Option<String>,
    pub text_color: Option<String>,
    #[serde(default)]
    pub key_colors: BTreeMap<String, String>,
    #[serde(default)]
    pub fonts: ComputedFonts,
}

/// Normalized result of fetching one URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRecord {
    pub url: String,
    pub title: String,
    pub description: String,
    pub text: String,
    pub images: Vec<ImageRef>,
    /// Same-site absolute URLs, normalized, deduplicated in document order.
    pub links: Vec<String>,
    #[serde(skip)]
    pub raw_html: String,
    pub page_type: PageType,
    pub computed_style_hints: Option<ComputedStyleHints>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorSource {
    BrandElement,
    CssInline,
    BrandCssRule,
    StyleTag,
    ComputedBackground,
    ComputedText,
    ComputedButton,
    ComputedLink,
    ComputedHeader,
    BodyBackground,
}

impl ColorSource {
    /// Trust ranking of the source; 1 is most trusted.
    pub fn priority(self) -> u8 {
        match self {
            ColorSource::BrandElement
            | ColorSource::BrandCssRule
            | ColorSource::ComputedBackground
            | ColorSource::ComputedText
            | ColorSource::ComputedButton
            | ColorSource::ComputedLink
            | ColorSource::ComputedHeader => 1,
            ColorSource::CssInline | ColorSource::BodyBackground => 2,
            ColorSource::StyleTag => 3,
        }
    }

    pub fn is_background(self) -> bool {
        matches!(
            self,
            ColorSource::ComputedBackground | ColorSource::BodyBackground
        )
    }
}

/// An unresolved, source-tagged color observation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorCandidate {
    /// Always `#RRGGBB`, uppercase.
    pub hex: String,
    pub approximate_name: String,
    pub source: ColorSource,
    pub priority: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorInfo {
    pub name: String,
    pub hex: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorPalette {
    pub background: Option<ColorInfo>,
    pub primary: Option<ColorInfo>,
    pub secondary: Option<ColorInfo>,
    pub support_1: Option<ColorInfo>,
    pub support_2: Option<ColorInfo>,
    pub support_3: Option<ColorInfo>,
    pub positive: Option<ColorInfo>,
}

impl ColorPalette {
    /// The first support slot doubles as the accent color.
    pub fn accent(&self) -> Option<&ColorInfo> {
        self.support_1.as_ref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypographyInfo {
    pub primary_font: Option<String>,
    pub secondary_font: Option<String>,
    pub font_families: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlResult {
    pub pages: Vec<PageRecord>,
    pub visited_urls: BTreeSet<String>,
    pub discovered_but_unvisited: BTreeSet<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSummary {
    pub url: String,
    pub page_type: PageType,
    pub title: String,
    pub description: String,
    pub text_preview: String,
}

/// Everything the brand synthesizer downstream gets to see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalBundle {
    pub seed_url: String,
    pub generated_at: String,
    pub pages: Vec<PageRecord>,
    pub page_summaries: Vec<PageSummary>,
    pub colors: Vec<ColorCandidate>,
    pub palette: ColorPalette,
    pub typography: TypographyInfo,
    pub combined_text: String,
    pub titles: Vec<String>,
    pub descriptions: Vec<String>,
    pub image_urls: Vec<String>,
    pub brand_name_hint: Option<String>,
    pub visited_urls: BTreeSet<String>,
    pub unvisited_urls: BTreeSet<String>,
    /// Set when the crawl accepted no page at all.
    pub degraded: bool,
}
