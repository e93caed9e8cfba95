use anyhow::{Result, bail};
use async_trait::async_trait;
use brandscout::models::ComputedStyleHints;
use brandscout::renderer::{BrowserEngine, RenderOptions, RenderedSnapshot, SettleCondition};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What a `ScriptedEngine` was asked to do.
#[derive(Debug, Default)]
pub struct EngineLog {
    pub navigated: Vec<String>,
    pub finished_pages: usize,
    pub closed: bool,
}

/// A browser stand-in that plays back canned snapshots.
///
/// Each URL maps to a sequence of snapshots; every `snapshot` call advances
/// through it and the last one repeats.
#[derive(Default)]
pub struct ScriptedEngine {
    pages: HashMap<String, Vec<RenderedSnapshot>>,
    hanging: HashSet<String>,
    slow: HashSet<String>,
    crashing: HashSet<String>,
    redirects: HashMap<String, String>,
    settles_at: Option<SettleCondition>,
    styles: Option<ComputedStyleHints>,
    current: Option<(String, usize)>,
    log: Arc<Mutex<EngineLog>>,
}

#[allow(dead_code)]
impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, url: &str, snapshot: RenderedSnapshot) -> Self {
        self.sequence(url, vec![snapshot])
    }

    pub fn sequence(mut self, url: &str, snapshots: Vec<RenderedSnapshot>) -> Self {
        self.pages.insert(url.to_string(), snapshots);
        self
    }

    /// Navigation to `url` never completes.
    pub fn hang_on(mut self, url: &str) -> Self {
        self.hanging.insert(url.to_string());
        self.pages.entry(url.to_string()).or_default();
        self
    }

    /// The document loads but navigation never reports completion.
    pub fn slow_load(mut self, url: &str) -> Self {
        self.slow.insert(url.to_string());
        self
    }

    /// Navigating to `from` lands on `to`, which must have its own snapshots.
    pub fn redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }

    /// The browser process dies while navigating to `url`.
    pub fn crash_on(mut self, url: &str) -> Self {
        self.crashing.insert(url.to_string());
        self
    }

    /// Only this rung of the settle ladder (and looser ones) reports ready.
    pub fn settles_at(mut self, condition: SettleCondition) -> Self {
        self.settles_at = Some(condition);
        self
    }

    pub fn with_styles(mut self, styles: ComputedStyleHints) -> Self {
        self.styles = Some(styles);
        self
    }

    pub fn log(&self) -> Arc<Mutex<EngineLog>> {
        self.log.clone()
    }

    pub fn boxed(self) -> Box<dyn BrowserEngine> {
        Box::new(self)
    }
}

fn rung(condition: SettleCondition) -> usize {
    SettleCondition::LADDER
        .iter()
        .position(|c| *c == condition)
        .unwrap_or(0)
}

#[async_trait]
impl BrowserEngine for ScriptedEngine {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.log.lock().unwrap().navigated.push(url.to_string());
        if self.crashing.contains(url) {
            panic!("browser crashed while loading {url}");
        }
        if self.hanging.contains(url) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        let landed = self.redirects.get(url).map_or(url, String::as_str);
        if !self.pages.contains_key(landed) {
            bail!("net::ERR_NAME_NOT_RESOLVED");
        }
        self.current = Some((landed.to_string(), 0));
        if self.slow.contains(url) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok(())
    }

    async fn is_settled(&mut self, condition: SettleCondition) -> Result<bool> {
        let target = self.settles_at.unwrap_or(SettleCondition::ContentSettled);
        Ok(rung(condition) >= rung(target))
    }

    async fn snapshot(&mut self) -> Result<RenderedSnapshot> {
        let Some((url, index)) = self.current.as_mut() else {
            bail!("no page open");
        };
        let snapshots = &self.pages[url.as_str()];
        let Some(snapshot) = snapshots.get(*index).or_else(|| snapshots.last()) else {
            bail!("page has no content");
        };
        *index += 1;
        Ok(RenderedSnapshot {
            url: Some(url.clone()),
            ..snapshot.clone()
        })
    }

    async fn scroll_pass(&mut self) -> Result<()> {
        Ok(())
    }

    async fn computed_styles(&mut self) -> Result<ComputedStyleHints> {
        match &self.styles {
            Some(styles) => Ok(styles.clone()),
            None => bail!("styles not scripted"),
        }
    }

    async fn finish_page(&mut self) {
        self.current = None;
        self.log.lock().unwrap().finished_pages += 1;
    }

    async fn close(&mut self) -> Result<()> {
        self.log.lock().unwrap().closed = true;
        Ok(())
    }
}

/// A rendered page whose markup carries `title` and `text`.
#[allow(dead_code)]
pub fn rendered(title: &str, text: &str) -> RenderedSnapshot {
    RenderedSnapshot {
        title: title.to_string(),
        text: text.to_string(),
        html: format!(
            "<html><head><title>{title}</title></head><body><p>{text}</p></body></html>"
        ),
        url: None,
    }
}

#[allow(dead_code)]
pub fn challenge() -> RenderedSnapshot {
    rendered(
        "Just a moment...",
        "Checking your browser before accessing the site.",
    )
}

#[allow(dead_code)]
pub const LONG_TEXT: &str = "Acme builds rockets, rocket skates and giant magnets for \
    discerning coyotes everywhere. Every product is tested in the desert before it \
    ships, and our support team answers every letter.";

/// Timings small enough for tests.
#[allow(dead_code)]
pub fn fast_options() -> RenderOptions {
    RenderOptions {
        navigation_timeout: Duration::from_secs(1),
        settle_timeout: Duration::from_millis(30),
        extra_wait: Duration::ZERO,
        suspected_extra_wait: Duration::ZERO,
        protection_wait: Duration::from_millis(300),
        poll_interval: Duration::from_millis(10),
        scroll: false,
        scroll_pause: Duration::ZERO,
        page_timeout: Duration::from_secs(5),
    }
}
