use crate::models::PageType;
use url::Url;

const ABOUT_MARKERS: &[&str] = &[
    "/about",
    "about-us",
    "/company",
    "/our-story",
    "/team",
    "/who-we-are",
    "/mission",
];
const CONTACT_MARKERS: &[&str] = &["/contact", "contact-us"];
const BLOG_MARKERS: &[&str] = &[
    "/blog",
    "/news",
    "/article",
    "/articles",
    "/posts",
    "/press",
    "/insights",
    "/stories",
];
const PRODUCT_MARKERS: &[&str] = &[
    "/product",
    "/service",
    "/shop",
    "/store",
    "/solutions",
    "/pricing",
    "/features",
    "/collections",
];
const ROOT_EQUIVALENTS: &[&str] = &[
    "",
    "/",
    "/index.html",
    "/index.htm",
    "/index.php",
    "/home",
];

/// Labels a page from its URL path, falling back to the title for paths
/// that say nothing.
///
/// Total: every input maps to exactly one label. Unparseable URLs are
/// treated as bare paths.
pub fn classify(url: &str, title: Option<&str>, _text: Option<&str>) -> PageType {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_lowercase(),
        Err(_) => url.to_lowercase(),
    };

    let by_path = classify_path(&path);
    if by_path != PageType::Other || is_contact(&path) {
        return by_path;
    }

    match title.map(str::to_lowercase) {
        Some(title) if title.starts_with("about") || title.contains("about us") => {
            PageType::About
        }
        Some(title) if title.starts_with("blog") || title.contains(" blog") => PageType::Blog,
        _ => PageType::Other,
    }
}

fn classify_path(path: &str) -> PageType {
    if ABOUT_MARKERS.iter().any(|m| path.contains(m)) {
        PageType::About
    } else if is_contact(path) {
        PageType::Other
    } else if BLOG_MARKERS.iter().any(|m| path.contains(m)) {
        PageType::Blog
    } else if PRODUCT_MARKERS.iter().any(|m| path.contains(m)) {
        PageType::Products
    } else if ROOT_EQUIVALENTS.contains(&path.trim_end_matches('/')) {
        PageType::Homepage
    } else {
        PageType::Other
    }
}

fn is_contact(path: &str) -> bool {
    CONTACT_MARKERS.iter().any(|m| path.contains(m))
}
