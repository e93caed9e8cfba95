//! Color candidates from markup and computed styles.

use crate::models::{ColorCandidate, ColorSource, ComputedStyleHints};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashMap;

/// Upper bound on resolved candidates.
pub const MAX_COLORS: usize = 15;

static HEX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"#(?:[0-9a-fA-F]{6}|[0-9a-fA-F]{3})\b").expect("hex regex should be valid")
});
static RGB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)rgba?\(\s*(\d{1,3})[\s,]+(\d{1,3})[\s,]+(\d{1,3})\s*(?:[,/]\s*[\d.]+%?\s*)?\)")
        .expect("rgb regex should be valid")
});
static NAMED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:^|[;\s{])(?:background-color|background|color)\s*:\s*(white|black|red|green|blue|gray|grey)\b",
    )
    .expect("named color regex should be valid")
});
static CSS_RULE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^{}]+)\{([^{}]*)\}").expect("css rule regex should be valid"));
static BACKGROUND_DECL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)background(?:-color)?\s*:\s*([^;]+)").expect("background regex should be valid")
});

static STYLE_TAG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("style").expect("style selector should be valid"));
static STYLED_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[style]").expect("[style] selector should be valid"));
static BRAND_ELEMENT_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        "button[style], nav[style], header[style], h1[style], h2[style], \
         [class*='btn'][style], [class*='cta'][style], [class*='logo'][style], \
         [class*='brand'][style], [class*='primary'][style], \
         [id*='logo'][style], [id*='brand'][style]",
    )
    .expect("brand element selector should be valid")
});
static PAGE_BACKGROUND_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("html[style], body[style], main[style]")
        .expect("page background selector should be valid")
});

/// Selector fragments marking a `<style>` rule as brand-bearing.
const BRAND_RULE_MARKERS: &[&str] = &[":root", ".primary", ".brand", ".btn", "button"];

/// Produces color candidates for one page.
pub trait ColorExtractor: Send + Sync {
    fn extract_colors(
        &self,
        html: &str,
        computed: Option<&ComputedStyleHints>,
    ) -> Vec<ColorCandidate>;
}

/// Regex scan of inline styles and `<style>` blocks plus computed values.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkupColorExtractor;

impl ColorExtractor for MarkupColorExtractor {
    fn extract_colors(
        &self,
        html: &str,
        computed: Option<&ComputedStyleHints>,
    ) -> Vec<ColorCandidate> {
        let document = Html::parse_document(html);
        let mut found = Vec::new();

        if let Some(hints) = computed {
            push_computed(&mut found, hints);
        }

        for el in document.select(&BRAND_ELEMENT_SELECTOR) {
            if let Some(style) = el.value().attr("style") {
                push_all(&mut found, scan_css_colors(style), ColorSource::BrandElement);
            }
        }

        let style_blocks: Vec<String> = document
            .select(&STYLE_TAG_SELECTOR)
            .map(|el| el.text().collect())
            .collect();

        for css in &style_blocks {
            for rule in CSS_RULE_RE.captures_iter(css) {
                let selector = rule[1].to_ascii_lowercase();
                if BRAND_RULE_MARKERS.iter().any(|m| selector.contains(m)) {
                    push_all(&mut found, scan_css_colors(&rule[2]), ColorSource::BrandCssRule);
                }
            }
        }

        for el in document.select(&PAGE_BACKGROUND_SELECTOR) {
            let Some(style) = el.value().attr("style") else {
                continue;
            };
            for decl in BACKGROUND_DECL_RE.captures_iter(style) {
                let value = format!("background: {}", &decl[1]);
                push_all(&mut found, scan_css_colors(&value), ColorSource::BodyBackground);
            }
        }

        for el in document.select(&STYLED_SELECTOR) {
            if let Some(style) = el.value().attr("style") {
                push_all(&mut found, scan_css_colors(style), ColorSource::CssInline);
            }
        }

        for css in &style_blocks {
            for rule in CSS_RULE_RE.captures_iter(css) {
                push_all(&mut found, scan_css_colors(&rule[2]), ColorSource::StyleTag);
            }
        }

        resolve_candidates(found)
    }
}

fn push_computed(found: &mut Vec<ColorCandidate>, hints: &ComputedStyleHints) {
    let mut push = |raw: &str, source: ColorSource| {
        if is_transparent(raw) {
            return;
        }
        if let Some(hex) = normalize_color(raw) {
            found.push(candidate(hex, source));
        }
    };

    if let Some(bg) = &hints.background_color {
        push(bg, ColorSource::ComputedBackground);
    }
    if let Some(text) = &hints.text_color {
        push(text, ColorSource::ComputedText);
    }
    for (role, raw) in &hints.key_colors {
        let source = match role.as_str() {
            "button" => ColorSource::ComputedButton,
            "link" => ColorSource::ComputedLink,
            "header" => ColorSource::ComputedHeader,
            other => {
                tracing::trace!(role = other, "Ignoring computed color for unknown role");
                continue;
            }
        };
        push(raw, source);
    }
}

fn push_all(found: &mut Vec<ColorCandidate>, hexes: Vec<String>, source: ColorSource) {
    found.extend(hexes.into_iter().map(|hex| candidate(hex, source)));
}

fn candidate(hex: String, source: ColorSource) -> ColorCandidate {
    ColorCandidate {
        approximate_name: approximate_name(&hex),
        hex,
        source,
        priority: source.priority(),
    }
}

/// Every color literal in a run of CSS declarations, normalized, in source
/// order.
pub fn scan_css_colors(css: &str) -> Vec<String> {
    let mut hits: Vec<(usize, String)> = Vec::new();

    for m in HEX_RE.find_iter(css) {
        if let Some(hex) = normalize_color(m.as_str()) {
            hits.push((m.start(), hex));
        }
    }
    for m in RGB_RE.find_iter(css) {
        if let Some(hex) = normalize_color(m.as_str()) {
            hits.push((m.start(), hex));
        }
    }
    for caps in NAMED_RE.captures_iter(css) {
        if let Some(name) = caps.get(1)
            && let Some(hex) = normalize_color(name.as_str())
        {
            hits.push((name.start(), hex));
        }
    }

    hits.sort_by_key(|(pos, _)| *pos);
    hits.into_iter().map(|(_, hex)| hex).collect()
}

/// Canonical `#RRGGBB` for a hex, `rgb()`/`rgba()` or small-table named
/// color. Alpha is ignored.
pub fn normalize_color(raw: &str) -> Option<String> {
    let value = raw.trim().to_ascii_lowercase();

    if let Some(digits) = value.strip_prefix('#') {
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        return match digits.len() {
            3 => {
                let expanded: String = digits.chars().flat_map(|c| [c, c]).collect();
                Some(format!("#{}", expanded.to_ascii_uppercase()))
            }
            6 => Some(format!("#{}", digits.to_ascii_uppercase())),
            _ => None,
        };
    }

    if let Some(caps) = RGB_RE.captures(&value) {
        let channel = |i: usize| caps[i].parse::<u16>().ok().map(|v| v.min(255) as u8);
        return Some(to_hex(channel(1)?, channel(2)?, channel(3)?));
    }

    let hex = match value.as_str() {
        "white" => "#FFFFFF",
        "black" => "#000000",
        "red" => "#FF0000",
        "green" => "#008000",
        "blue" => "#0000FF",
        "gray" | "grey" => "#808080",
        _ => return None,
    };
    Some(hex.to_string())
}

/// Browsers report unset backgrounds as fully transparent black.
pub fn is_transparent(raw: &str) -> bool {
    let value = raw.trim().to_ascii_lowercase();
    if value == "transparent" {
        return true;
    }
    value.starts_with("rgba")
        && value
            .trim_end_matches(')')
            .rsplit([',', '/'])
            .next()
            .and_then(|alpha| alpha.trim().parse::<f32>().ok())
            .is_some_and(|alpha| alpha == 0.0)
}

fn to_hex(r: u8, g: u8, b: u8) -> String {
    format!("#{r:02X}{g:02X}{b:02X}")
}

fn channels(hex: &str) -> Option<(u8, u8, u8)> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
    Some((byte(0)?, byte(2)?, byte(4)?))
}

/// Coarse RGB bucket name used in reports and palette roles.
pub fn approximate_name(hex: &str) -> String {
    let Some((r, g, b)) = channels(hex) else {
        return "unknown".to_string();
    };

    let name = if r > 200 && g > 200 && b > 200 {
        "white"
    } else if r < 50 && g < 50 && b < 50 {
        "black"
    } else if r > g && r > b {
        if r > 200 { "red" } else { "dark red" }
    } else if g > r && g > b {
        if g > 200 { "green" } else { "dark green" }
    } else if b > r && b > g {
        if b > 200 { "blue" } else { "dark blue" }
    } else if r > 150 && g > 150 {
        "yellow"
    } else if r > 150 && b > 150 {
        "magenta"
    } else if g > 150 && b > 150 {
        "cyan"
    } else {
        "gray"
    };
    name.to_string()
}

/// Black, white and light grays that rarely carry brand identity.
pub fn is_neutral(hex: &str) -> bool {
    let hex = hex.to_ascii_uppercase();
    if hex == "#000000" || hex == "#FFFFFF" {
        return true;
    }
    let Some((r, g, b)) = channels(&hex) else {
        return false;
    };
    if r != g || g != b {
        return false;
    }
    let mut digits: Vec<char> = hex[1..].chars().collect();
    digits.sort_unstable();
    digits.dedup();
    digits.len() <= 2 && digits.contains(&'F')
}

/// Dedupes by hex keeping the most trusted occurrence, drops neutrals that
/// did not come from a priority-1 source, sorts by priority (discovery order
/// breaks ties) and caps at [`MAX_COLORS`].
pub fn resolve_candidates(candidates: Vec<ColorCandidate>) -> Vec<ColorCandidate> {
    let mut resolved: Vec<ColorCandidate> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for mut c in candidates {
        c.hex = c.hex.to_ascii_uppercase();
        match index.get(&c.hex) {
            Some(&i) if c.priority < resolved[i].priority => resolved[i] = c,
            Some(_) => {}
            None => {
                index.insert(c.hex.clone(), resolved.len());
                resolved.push(c);
            }
        }
    }

    resolved.retain(|c| c.priority == 1 || !is_neutral(&c.hex));
    resolved.sort_by_key(|c| c.priority);
    resolved.truncate(MAX_COLORS);
    resolved
}
