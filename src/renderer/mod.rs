//! Rendered-browser fetch strategy.
//!
//! A browser session cannot be shared between tasks, so the strategy is a
//! serialized capability: one worker task owns the `BrowserEngine` and serves
//! requests from a queue in arrival order. `RenderedFetcher` is the cheap
//! handle callers hold.

pub mod chromium;

use crate::error::FetchError;
use crate::frontier::is_same_site;
use crate::models::{ComputedStyleHints, PageRecord};
use crate::page_parser::parse_page;
use crate::protection::is_protection_page;
use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use url::Url;

/// Page settlement conditions, strictest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettleCondition {
    /// Document complete, images decoded, body carries real text.
    ContentSettled,
    /// No resource finished loading recently.
    NetworkIdle,
    /// `load` fired.
    Load,
    /// `DOMContentLoaded` fired.
    DomReady,
}

impl SettleCondition {
    pub const LADDER: [SettleCondition; 4] = [
        SettleCondition::ContentSettled,
        SettleCondition::NetworkIdle,
        SettleCondition::Load,
        SettleCondition::DomReady,
    ];
}

/// How long to linger after the page settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitMode {
    Standard,
    /// The lightweight strategy already saw a challenge page for this URL.
    SuspectedProtection,
}

/// What the browser currently shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedSnapshot {
    pub title: String,
    /// Visible body text.
    pub text: String,
    pub html: String,
    /// Address the browser ended up at, when the engine reports one.
    pub url: Option<String>,
}

/// The primitives the render worker needs from a browser.
///
/// Implementations operate on a single current page; `navigate` opens it and
/// `finish_page` releases it. The page must stay readable even when the
/// caller stops waiting on `navigate`.
#[async_trait]
pub trait BrowserEngine: Send {
    /// Opens a page and loads `url`; resolves once the main document arrives.
    async fn navigate(&mut self, url: &str) -> Result<()>;
    /// One non-blocking probe of `condition`.
    async fn is_settled(&mut self, condition: SettleCondition) -> Result<bool>;
    async fn snapshot(&mut self) -> Result<RenderedSnapshot>;
    /// Scroll to the bottom and back to trigger lazy content.
    async fn scroll_pass(&mut self) -> Result<()>;
    async fn computed_styles(&mut self) -> Result<ComputedStyleHints>;
    async fn finish_page(&mut self);
    async fn close(&mut self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub navigation_timeout: Duration,
    /// Budget for each rung of the settle ladder.
    pub settle_timeout: Duration,
    pub extra_wait: Duration,
    pub suspected_extra_wait: Duration,
    /// Budget for waiting out a challenge page.
    pub protection_wait: Duration,
    pub poll_interval: Duration,
    pub scroll: bool,
    pub scroll_pause: Duration,
    /// Hard ceiling on a single rendered fetch.
    pub page_timeout: Duration,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(30),
            settle_timeout: Duration::from_secs(5),
            extra_wait: Duration::from_millis(2500),
            suspected_extra_wait: Duration::from_secs(5),
            protection_wait: Duration::from_secs(20),
            poll_interval: Duration::from_millis(500),
            scroll: true,
            scroll_pause: Duration::from_millis(800),
            page_timeout: Duration::from_secs(90),
        }
    }
}

/// Body text must at least double, and by this much, to count as growth.
const MIN_BODY_GROWTH: usize = 200;

struct RenderRequest {
    url: String,
    mode: WaitMode,
    reply: oneshot::Sender<Result<PageRecord, FetchError>>,
}

/// Handle to the render worker.
pub struct RenderedFetcher {
    requests: mpsc::Sender<RenderRequest>,
    worker: JoinHandle<()>,
}

impl RenderedFetcher {
    /// Starts a worker that owns `engine` until the handle is shut down or
    /// dropped.
    pub fn spawn(engine: Box<dyn BrowserEngine>, options: RenderOptions) -> Self {
        let (requests, inbox) = mpsc::channel(16);
        let worker = tokio::spawn(run_worker(engine, options, inbox));
        Self { requests, worker }
    }

    /// Launches headless Chromium. Failure means the capability is absent.
    pub async fn launch_chromium(
        chrome_path: Option<&str>,
        options: RenderOptions,
    ) -> Result<Self, FetchError> {
        let engine = chromium::ChromiumEngine::launch(chrome_path)
            .await
            .map_err(|e| FetchError::BrowserUnavailable(format!("{e:#}")))?;
        Ok(Self::spawn(Box::new(engine), options))
    }

    pub async fn fetch(&self, url: &str, mode: WaitMode) -> Result<PageRecord, FetchError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(RenderRequest {
                url: url.to_string(),
                mode,
                reply,
            })
            .await
            .map_err(|_| FetchError::BrowserUnavailable("render worker stopped".to_string()))?;

        response
            .await
            .map_err(|_| FetchError::BrowserUnavailable("render worker dropped request".to_string()))?
    }

    /// Closes the queue and waits for the worker to close the browser.
    pub async fn shutdown(self) {
        let Self { requests, worker } = self;
        drop(requests);
        if let Err(e) = worker.await {
            tracing::warn!(error = %e, "Render worker ended abnormally");
        }
    }
}

/// Whether the rendered strategy can be used in this run.
pub enum RenderCapability {
    Available(RenderedFetcher),
    Unavailable(String),
}

impl RenderCapability {
    pub fn fetcher(&self) -> Option<&RenderedFetcher> {
        match self {
            RenderCapability::Available(fetcher) => Some(fetcher),
            RenderCapability::Unavailable(_) => None,
        }
    }

    pub async fn shutdown(self) {
        if let RenderCapability::Available(fetcher) = self {
            fetcher.shutdown().await;
        }
    }
}

async fn run_worker(
    mut engine: Box<dyn BrowserEngine>,
    options: RenderOptions,
    mut inbox: mpsc::Receiver<RenderRequest>,
) {
    while let Some(request) = inbox.recv().await {
        let outcome = tokio::time::timeout(
            options.page_timeout,
            render_page(engine.as_mut(), &options, &request.url, request.mode),
        )
        .await
        .unwrap_or_else(|_| {
            Err(FetchError::Timeout {
                url: request.url.clone(),
            })
        });

        engine.finish_page().await;
        let _ = request.reply.send(outcome);
    }

    if let Err(e) = engine.close().await {
        tracing::warn!(error = %e, "Failed to close browser");
    } else {
        tracing::debug!("Browser closed");
    }
}

async fn render_page(
    engine: &mut dyn BrowserEngine,
    options: &RenderOptions,
    url: &str,
    mode: WaitMode,
) -> Result<PageRecord, FetchError> {
    let page_url = Url::parse(url).map_err(|e| FetchError::Parse {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    match tokio::time::timeout(options.navigation_timeout, engine.navigate(url)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            return Err(FetchError::Network {
                url: url.to_string(),
                message: format!("{e:#}"),
            });
        }
        Err(_) => tracing::warn!(
            url = %url,
            timeout_secs = options.navigation_timeout.as_secs_f64(),
            "Navigation timed out, settling on whatever loaded"
        ),
    }

    match wait_until_settled(engine, options).await {
        Some(condition) => tracing::debug!(url = %url, ?condition, "Page settled"),
        None => tracing::warn!(url = %url, "Page never settled, reading it anyway"),
    }

    let extra_wait = match mode {
        WaitMode::Standard => options.extra_wait,
        WaitMode::SuspectedProtection => options.suspected_extra_wait,
    };
    tokio::time::sleep(extra_wait).await;

    if options.scroll {
        if let Err(e) = engine.scroll_pass().await {
            tracing::debug!(url = %url, error = %e, "Scroll pass failed");
        } else {
            tokio::time::sleep(options.scroll_pause).await;
        }
    }

    let mut snapshot = take_snapshot(engine, url).await?;
    if is_protection_page(&snapshot.title, &snapshot.text) {
        tracing::info!(url = %url, "Challenge page detected, waiting for it to clear");
        snapshot = match await_challenge(engine, options, url, snapshot).await? {
            Some(cleared) => cleared,
            None => {
                tracing::warn!(url = %url, "Challenge did not clear");
                return Err(FetchError::Protected {
                    url: url.to_string(),
                });
            }
        };
    }

    let computed = match engine.computed_styles().await {
        Ok(hints) => Some(hints),
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "Computed styles unavailable");
            None
        }
    };

    let final_url = landing_url(&page_url, &snapshot)?;
    let mut page = parse_page(&final_url, &snapshot.html);
    if !snapshot.title.trim().is_empty() {
        page.title = snapshot.title.trim().to_string();
    }
    page.computed_style_hints = computed;
    Ok(page)
}

/// Where the browser ended up. Redirects must stay on the same site.
fn landing_url(requested: &Url, snapshot: &RenderedSnapshot) -> Result<Url, FetchError> {
    let Some(landed) = snapshot.url.as_deref().and_then(|u| Url::parse(u).ok()) else {
        return Ok(requested.clone());
    };
    if !matches!(landed.scheme(), "http" | "https") {
        return Ok(requested.clone());
    }
    if !is_same_site(requested, &landed) {
        return Err(FetchError::OffSite {
            url: requested.to_string(),
            target: landed.to_string(),
        });
    }
    Ok(landed)
}

/// Walks the settle ladder; returns the first condition reached.
async fn wait_until_settled(
    engine: &mut dyn BrowserEngine,
    options: &RenderOptions,
) -> Option<SettleCondition> {
    for condition in SettleCondition::LADDER {
        let deadline = Instant::now() + options.settle_timeout;
        loop {
            match engine.is_settled(condition).await {
                Ok(true) => return Some(condition),
                Ok(false) => {}
                Err(e) => {
                    tracing::debug!(?condition, error = %e, "Settle probe failed");
                    break;
                }
            }
            if Instant::now() >= deadline {
                tracing::debug!(?condition, "Settle condition timed out, loosening");
                break;
            }
            tokio::time::sleep(options.poll_interval).await;
        }
    }
    None
}

/// Polls until the challenge clears or the budget runs out.
///
/// Success needs the page to stop looking like a challenge plus one of two
/// signals: a new title seen on two consecutive polls, or body text that
/// grew substantially.
async fn await_challenge(
    engine: &mut dyn BrowserEngine,
    options: &RenderOptions,
    url: &str,
    initial: RenderedSnapshot,
) -> Result<Option<RenderedSnapshot>, FetchError> {
    let deadline = Instant::now() + options.protection_wait;
    let base_len = initial.text.chars().count();
    let growth_target = (base_len * 2).max(base_len + MIN_BODY_GROWTH);
    let mut previous_title = initial.title.clone();

    while Instant::now() < deadline {
        tokio::time::sleep(options.poll_interval).await;
        let current = take_snapshot(engine, url).await?;

        let title_stable = current.title == previous_title
            && current.title != initial.title
            && !current.title.trim().is_empty();
        let body_grew = current.text.chars().count() >= growth_target;
        previous_title = current.title.clone();

        if (title_stable || body_grew) && !is_protection_page(&current.title, &current.text) {
            tracing::info!(url = %url, title_stable, body_grew, "Challenge cleared");
            return Ok(Some(current));
        }
    }

    Ok(None)
}

async fn take_snapshot(
    engine: &mut dyn BrowserEngine,
    url: &str,
) -> Result<RenderedSnapshot, FetchError> {
    engine.snapshot().await.map_err(|e| FetchError::Parse {
        url: url.to_string(),
        message: format!("could not read rendered page: {e:#}"),
    })
}
