use crate::classifier::classify;
use crate::frontier::{is_same_site, normalize_url};
use crate::models::{ImageRef, PageRecord};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use url::Url;

pub const MAX_TEXT_CHARS: usize = 5000;
pub const MAX_IMAGES: usize = 20;
pub const MAX_LINKS: usize = 50;

static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("title selector should be valid"));
static META_DESC_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("meta[name='description']").expect("meta description selector should be valid")
});
static OG_DESC_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("meta[property='og:description']")
        .expect("og:description selector should be valid")
});
static BODY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("body").expect("body selector should be valid"));
static IMG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img").expect("img selector should be valid"));
static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("a[href] selector should be valid"));

const NON_TEXT_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Builds a `PageRecord` from markup. Never fails: missing pieces come back
/// empty.
pub fn parse_page(page_url: &Url, html: &str) -> PageRecord {
    let document = Html::parse_document(html);

    let title = extract_title(&document);
    let description = extract_description(&document);
    let text = extract_text(&document);
    let images = extract_images(&document, page_url);
    let links = extract_links(&document, page_url);
    let url = normalize_url(page_url);
    let page_type = classify(&url, Some(&title), Some(&text));

    PageRecord {
        url,
        title,
        description,
        text,
        images,
        links,
        raw_html: html.to_string(),
        page_type,
        computed_style_hints: None,
    }
}

fn extract_title(document: &Html) -> String {
    document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .unwrap_or_default()
}

fn extract_description(document: &Html) -> String {
    document
        .select(&META_DESC_SELECTOR)
        .next()
        .or_else(|| document.select(&OG_DESC_SELECTOR).next())
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
}

fn extract_text(document: &Html) -> String {
    let root = document
        .select(&BODY_SELECTOR)
        .next()
        .unwrap_or_else(|| document.root_element());

    let mut raw = String::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| NON_TEXT_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            raw.push_str(text);
            raw.push(' ');
        }
    }

    truncate_chars(&collapse_whitespace(&raw), MAX_TEXT_CHARS)
}

fn extract_images(document: &Html, page_url: &Url) -> Vec<ImageRef> {
    document
        .select(&IMG_SELECTOR)
        .filter_map(|el| {
            let src = el
                .value()
                .attr("src")
                .filter(|s| !s.trim().is_empty())
                .or_else(|| el.value().attr("data-src"))?;
            let absolute = page_url.join(src.trim()).ok()?;
            Some(ImageRef {
                url: absolute.to_string(),
                alt: el.value().attr("alt").unwrap_or_default().trim().to_string(),
            })
        })
        .take(MAX_IMAGES)
        .collect()
}

fn extract_links(document: &Html, page_url: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    document
        .select(&ANCHOR_SELECTOR)
        .filter_map(|el| anchor_target(el, page_url))
        .filter(|link| seen.insert(link.clone()))
        .take(MAX_LINKS)
        .collect()
}

fn anchor_target(el: ElementRef<'_>, page_url: &Url) -> Option<String> {
    let href = el.value().attr("href")?.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let absolute = page_url.join(href).ok()?;
    if !matches!(absolute.scheme(), "http" | "https") || !is_same_site(page_url, &absolute) {
        return None;
    }
    Some(normalize_url(&absolute))
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cuts at a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
