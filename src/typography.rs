//! Font families from CSS and computed styles.

use crate::models::{ComputedFonts, TypographyInfo};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

pub const MAX_FONT_FAMILIES: usize = 5;

/// Names taken from the head of each `font-family` stack.
const NAMES_PER_STACK: usize = 2;

const GENERIC_FAMILIES: &[&str] = &[
    "serif",
    "sans-serif",
    "monospace",
    "cursive",
    "fantasy",
    "system-ui",
    "ui-serif",
    "ui-sans-serif",
    "ui-monospace",
    "emoji",
    "math",
    "inherit",
    "initial",
    "unset",
    "revert",
];

static FONT_FAMILY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)font-family\s*:\s*([^;{}]+)").expect("font-family regex should be valid")
});
static STYLE_TAG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("style").expect("style selector should be valid"));
static STYLED_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[style]").expect("[style] selector should be valid"));

/// Produces typography signals for one page.
pub trait FontExtractor: Send + Sync {
    fn extract_fonts(&self, html: &str, computed: Option<&ComputedFonts>) -> TypographyInfo;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CssFontExtractor;

impl FontExtractor for CssFontExtractor {
    fn extract_fonts(&self, html: &str, computed: Option<&ComputedFonts>) -> TypographyInfo {
        let document = Html::parse_document(html);

        let mut css_fonts = Vec::new();
        let sources = document
            .select(&STYLE_TAG_SELECTOR)
            .map(|el| el.text().collect::<String>())
            .chain(
                document
                    .select(&STYLED_SELECTOR)
                    .filter_map(|el| el.value().attr("style").map(str::to_string)),
            );
        for css in sources {
            for decl in FONT_FAMILY_RE.captures_iter(&css) {
                let names = parse_font_stack(&decl[1]);
                css_fonts.extend(names.into_iter().take(NAMES_PER_STACK));
            }
        }

        let body = computed
            .and_then(|f| f.body.as_deref())
            .and_then(|stack| parse_font_stack(stack).into_iter().next());
        let h1 = computed
            .and_then(|f| f.h1.as_deref())
            .and_then(|stack| parse_font_stack(stack).into_iter().next());

        let mut families = Vec::new();
        for name in body.iter().chain(h1.iter()).chain(css_fonts.iter()) {
            push_unique(&mut families, name);
        }
        families.truncate(MAX_FONT_FAMILIES);

        let primary_font = body.or_else(|| families.first().cloned());
        let secondary_font = h1
            .filter(|font| !same_font(primary_font.as_deref(), font))
            .or_else(|| {
                families
                    .iter()
                    .find(|font| !same_font(primary_font.as_deref(), font))
                    .cloned()
            });

        TypographyInfo {
            primary_font,
            secondary_font,
            font_families: families,
        }
    }
}

/// Family names of one `font-family` value with quotes, `!important`,
/// variables and generic keywords removed.
pub fn parse_font_stack(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|name| {
            name.replace("!important", "")
                .trim()
                .trim_matches(|c| c == '"' || c == '\'')
                .trim()
                .to_string()
        })
        .filter(|name| {
            !name.is_empty()
                && !name.starts_with("var(")
                && !name.starts_with('-')
                && !GENERIC_FAMILIES.contains(&name.to_ascii_lowercase().as_str())
        })
        .collect()
}

/// Combines per-page results in page order. The first page that names a
/// primary (or secondary) font wins; families are unioned up to the cap.
pub fn merge_typography(pages: &[TypographyInfo]) -> TypographyInfo {
    let mut merged = TypographyInfo::default();

    for info in pages {
        if merged.primary_font.is_none() {
            merged.primary_font = info.primary_font.clone();
        }
        for name in &info.font_families {
            push_unique(&mut merged.font_families, name);
        }
    }

    merged.secondary_font = pages
        .iter()
        .filter_map(|info| info.secondary_font.as_ref())
        .find(|font| !same_font(merged.primary_font.as_deref(), font))
        .cloned();
    merged.font_families.truncate(MAX_FONT_FAMILIES);
    merged
}

fn push_unique(families: &mut Vec<String>, name: &str) {
    if !families.iter().any(|f| f.eq_ignore_ascii_case(name)) {
        families.push(name.to_string());
    }
}

fn same_font(a: Option<&str>, b: &str) -> bool {
    a.is_some_and(|a| a.eq_ignore_ascii_case(b))
}
