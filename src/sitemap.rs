//! Sitemap discovery: `urlset` and `sitemapindex` documents.

use crate::fetcher::HttpFetcher;
use crate::frontier::{is_same_site, normalize_url};
use anyhow::Result;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashSet;
use url::Url;

/// Tried in order; the first one yielding page URLs wins.
pub const SITEMAP_PATHS: &[&str] = &["/sitemap.xml", "/sitemap_index.xml", "/sitemap1.xml"];

/// Child sitemaps followed from an index.
const MAX_CHILD_SITEMAPS: usize = 3;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SitemapDocument {
    /// `<url><loc>` entries.
    pub pages: Vec<String>,
    /// `<sitemap><loc>` entries of an index.
    pub sitemaps: Vec<String>,
}

/// Parse a sitemap XML string.
pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut doc = SitemapDocument::default();

    let mut in_url = false;
    let mut in_sitemap = false;
    let mut in_loc = false;
    let mut current_loc = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"url" => {
                    in_url = true;
                    current_loc.clear();
                }
                b"sitemap" => {
                    in_sitemap = true;
                    current_loc.clear();
                }
                b"loc" => in_loc = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"url" if in_url => {
                    if !current_loc.is_empty() {
                        doc.pages.push(current_loc.clone());
                    }
                    in_url = false;
                }
                b"sitemap" if in_sitemap => {
                    if !current_loc.is_empty() {
                        doc.sitemaps.push(current_loc.clone());
                    }
                    in_sitemap = false;
                }
                b"loc" => in_loc = false,
                _ => {}
            },
            Ok(Event::Text(e)) if in_loc && (in_url || in_sitemap) => {
                current_loc = e.unescape().unwrap_or_default().trim().to_string();
            }
            Ok(Event::CData(e)) if in_loc && (in_url || in_sitemap) => {
                current_loc = String::from_utf8_lossy(&e).trim().to_string();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(anyhow::anyhow!("XML parse error: {e}"));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(doc)
}

/// Fetches the site's sitemap and returns up to `limit` same-site page URLs,
/// normalized and deduplicated in document order.
///
/// Any failure along the way yields an empty list; the caller falls back to
/// probing conventional paths.
pub async fn discover_sitemap_urls(http: &HttpFetcher, base: &Url, limit: usize) -> Vec<String> {
    for path in SITEMAP_PATHS {
        let Ok(sitemap_url) = base.join(path) else {
            continue;
        };

        let doc = match fetch_document(http, sitemap_url.as_str()).await {
            Some(doc) => doc,
            None => continue,
        };

        let mut pages = doc.pages;
        for child in doc.sitemaps.iter().take(MAX_CHILD_SITEMAPS) {
            if let Some(child_doc) = fetch_document(http, child).await {
                pages.extend(child_doc.pages);
            }
        }

        let urls = same_site_pages(base, &pages, limit);
        if !urls.is_empty() {
            tracing::info!(sitemap = %sitemap_url, count = urls.len(), "Seeding from sitemap");
            return urls;
        }
    }

    tracing::debug!(base = %base, "No usable sitemap found");
    Vec::new()
}

async fn fetch_document(http: &HttpFetcher, url: &str) -> Option<SitemapDocument> {
    let body = match http.get_text(url).await {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "Sitemap not available");
            return None;
        }
    };

    match parse_sitemap(&body) {
        Ok(doc) => Some(doc),
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "Sitemap could not be parsed");
            None
        }
    }
}

fn same_site_pages(base: &Url, pages: &[String], limit: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    pages
        .iter()
        .filter_map(|raw| Url::parse(raw).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https") && is_same_site(base, url))
        .map(|url| normalize_url(&url))
        .filter(|url| seen.insert(url.clone()))
        .take(limit)
        .collect()
}
