use std::collections::{HashSet, VecDeque};
use url::Url;

/// Strips the fragment and a trailing slash (except on the root path).
/// Scheme, host, path and query are preserved.
pub fn normalize_url(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/');
        url.set_path(if trimmed.is_empty() { "/" } else { trimmed });
    }

    url.to_string()
}

/// Parses and normalizes, dropping anything that is not http(s).
pub fn normalize_str(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    match url.scheme() {
        "http" | "https" => Some(normalize_url(&url)),
        _ => None,
    }
}

/// Same site: hosts equal once a leading `www.` is ignored, same port.
pub fn is_same_site(base: &Url, candidate: &Url) -> bool {
    let strip = |host: Option<&str>| {
        host.map(|h| h.trim_start_matches("www.").to_ascii_lowercase())
    };
    strip(base.host_str()) == strip(candidate.host_str())
        && base.port_or_known_default() == candidate.port_or_known_default()
}

/// Normalizes `url` and, when it is the same site under another host spelling
/// (`www.` or not), rewrites the host to the one `base` uses.
pub fn canonical_url(base: &Url, url: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return None;
    }
    if is_same_site(base, &parsed) && parsed.host_str() != base.host_str() {
        parsed.set_host(base.host_str()).ok()?;
    }
    Some(normalize_url(&parsed))
}

/// Queue of discovered-but-not-yet-fetched URLs.
///
/// A URL is only ever queued once; callers hand in normalized strings.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<String>,
    queued: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_back(&mut self, url: String) -> bool {
        if !self.queued.insert(url.clone()) {
            return false;
        }
        self.queue.push_back(url);
        true
    }

    pub fn push_front(&mut self, url: String) -> bool {
        if !self.queued.insert(url.clone()) {
            return false;
        }
        self.queue.push_front(url);
        true
    }

    /// Moves an already queued URL to the front, or queues it there.
    pub fn promote(&mut self, url: String) {
        if self.queued.contains(&url) {
            self.queue.retain(|queued| queued != &url);
            self.queue.push_front(url);
        } else {
            self.push_front(url);
        }
    }

    pub fn pop_front(&mut self) -> Option<String> {
        let url = self.queue.pop_front()?;
        self.queued.remove(&url);
        Some(url)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.queued.contains(url)
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn remaining(&self) -> impl Iterator<Item = &String> {
        self.queue.iter()
    }
}
