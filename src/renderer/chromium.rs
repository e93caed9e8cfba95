//! Headless Chromium driven over CDP by chromiumoxide.

use super::{BrowserEngine, RenderedSnapshot, SettleCondition};
use crate::models::ComputedStyleHints;
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::Deserialize;
use std::path::PathBuf;
use tokio::task::JoinHandle;

/// Environment variable pointing at a Chromium/Chrome binary.
pub const CHROME_ENV: &str = "BRANDSCOUT_CHROME";

const SYSTEM_BINARIES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
];

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const CONTENT_SETTLED_JS: &str = r#"(() => {
  if (document.readyState !== 'complete' || !document.body) return false;
  const imagesDone = Array.from(document.images).every(img => img.complete);
  return imagesDone && document.body.innerText.trim().length > 50;
})()"#;

const NETWORK_IDLE_JS: &str = r#"(() => {
  if (document.readyState !== 'complete') return false;
  const entries = performance.getEntriesByType('resource');
  const last = entries.reduce((max, e) => Math.max(max, e.responseEnd), 0);
  return performance.now() - last > 500;
})()"#;

const LOAD_JS: &str = "document.readyState === 'complete'";

const DOM_READY_JS: &str = "document.readyState !== 'loading'";

const SNAPSHOT_JS: &str = r#"(() => ({
  title: document.title || '',
  text: document.body ? document.body.innerText : '',
  html: document.documentElement ? document.documentElement.outerHTML : '',
  url: location.href
}))()"#;

const SCROLL_JS: &str = r#"(async () => {
  const step = Math.max(window.innerHeight, 400);
  for (let y = 0; y < document.body.scrollHeight; y += step) {
    window.scrollTo(0, y);
    await new Promise(r => setTimeout(r, 100));
  }
  window.scrollTo(0, 0);
  return true;
})()"#;

const COMPUTED_STYLES_JS: &str = r#"(() => {
  const style = el => el ? window.getComputedStyle(el) : null;
  const body = style(document.body);
  const root = style(document.documentElement);
  const isClear = c => !c || c === 'transparent' || c === 'rgba(0, 0, 0, 0)';
  let background = body ? body.backgroundColor : null;
  if (isClear(background) && root) background = root.backgroundColor;

  const keyColors = {};
  const button = style(document.querySelector('button, .btn, [class*="button"], a[class*="btn"]'));
  if (button) keyColors.button = button.backgroundColor;
  const link = style(document.querySelector('a[href]'));
  if (link) keyColors.link = link.color;
  const header = style(document.querySelector('header, nav, [class*="header"]'));
  if (header) keyColors.header = header.backgroundColor;

  const h1 = style(document.querySelector('h1'));
  return {
    background_color: background || null,
    text_color: body ? body.color : null,
    key_colors: keyColors,
    fonts: {
      body: body ? body.fontFamily : null,
      h1: h1 ? h1.fontFamily : null
    }
  };
})()"#;

#[derive(Deserialize)]
struct SnapshotPayload {
    title: String,
    text: String,
    html: String,
    url: String,
}

/// Locates a browser binary: explicit path, then `BRANDSCOUT_CHROME`, then `PATH`.
pub fn find_chromium(explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        let path = PathBuf::from(path);
        return path.exists().then_some(path);
    }

    if let Ok(p) = std::env::var(CHROME_ENV) {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    SYSTEM_BINARIES
        .iter()
        .find_map(|name| which::which(name).ok())
}

pub struct ChromiumEngine {
    browser: Browser,
    handler: JoinHandle<()>,
    page: Option<Page>,
}

impl ChromiumEngine {
    pub async fn launch(chrome_path: Option<&str>) -> Result<Self> {
        let executable =
            find_chromium(chrome_path).context("no Chromium or Chrome binary found")?;
        tracing::debug!(path = %executable.display(), "Launching headless browser");

        let config = BrowserConfig::builder()
            .chrome_executable(executable)
            .window_size(1366, 900)
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--user-agent={USER_AGENT}"))
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch browser")?;

        let handler = tokio::spawn(async move { while handler.next().await.is_some() {} });

        Ok(Self {
            browser,
            handler,
            page: None,
        })
    }

    fn current_page(&self) -> Result<&Page> {
        self.page.as_ref().context("no page is open")
    }

    async fn eval<T: serde::de::DeserializeOwned>(&self, script: &str) -> Result<T> {
        let params = EvaluateParams::builder()
            .expression(script)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(|e| anyhow!("invalid evaluation: {e}"))?;

        self.current_page()?
            .evaluate_expression(params)
            .await
            .context("script evaluation failed")?
            .into_value()
            .map_err(|e| anyhow!("unexpected script result: {e:?}"))
    }
}

#[async_trait]
impl BrowserEngine for ChromiumEngine {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.finish_page().await;
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .context("failed to open a tab")?;
        // Stored before loading so a timed-out navigation leaves the tab readable.
        let page = self.page.insert(page);

        if let Err(e) = page.goto(url).await {
            bail!("navigation failed: {e}");
        }
        Ok(())
    }

    async fn is_settled(&mut self, condition: SettleCondition) -> Result<bool> {
        let script = match condition {
            SettleCondition::ContentSettled => CONTENT_SETTLED_JS,
            SettleCondition::NetworkIdle => NETWORK_IDLE_JS,
            SettleCondition::Load => LOAD_JS,
            SettleCondition::DomReady => DOM_READY_JS,
        };
        self.eval(script).await
    }

    async fn snapshot(&mut self) -> Result<RenderedSnapshot> {
        let payload: SnapshotPayload = self.eval(SNAPSHOT_JS).await?;
        Ok(RenderedSnapshot {
            title: payload.title,
            text: payload.text,
            html: payload.html,
            url: Some(payload.url),
        })
    }

    async fn scroll_pass(&mut self) -> Result<()> {
        let _: bool = self.eval(SCROLL_JS).await?;
        Ok(())
    }

    async fn computed_styles(&mut self) -> Result<ComputedStyleHints> {
        self.eval(COMPUTED_STYLES_JS).await
    }

    async fn finish_page(&mut self) {
        if let Some(page) = self.page.take()
            && let Err(e) = page.close().await
        {
            tracing::debug!(error = %e, "Failed to close tab");
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.finish_page().await;
        let closed = self.browser.close().await.map(|_| ());
        let _ = self.browser.wait().await;
        self.handler.abort();
        closed.context("failed to close browser")
    }
}
