use crate::error::FetchError;
use crate::frontier::{is_same_site, normalize_url};
use crate::http_client::build_http_client;
use crate::models::PageRecord;
use crate::page_parser::parse_page;
use anyhow::Result;
use governor::{
    Quota, RateLimiter, clock::DefaultClock, state::InMemoryState, state::direct::NotKeyed,
};
use std::num::NonZeroU32;
use url::Url;

/// Configuration for the lightweight HTTP strategy
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub requests_per_second: Option<f64>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            requests_per_second: None,
        }
    }
}

/// Plain HTTP + HTML parse. Fast, no JavaScript, no computed styles.
pub struct HttpFetcher {
    client: reqwest::Client,
    rate_limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let rate_limiter = config
            .requests_per_second
            .and_then(|rps| NonZeroU32::new(rps.ceil() as u32))
            .map(|per_second| RateLimiter::direct(Quota::per_second(per_second)));

        Ok(Self {
            client: build_http_client(config.timeout_secs)?,
            rate_limiter,
        })
    }

    /// GETs `url` and returns the body of a 2xx response.
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        self.get(url).await.map(|(_, body)| body)
    }

    /// GETs `url`, following redirects. Returns the address the response
    /// came from along with the body of a 2xx response.
    pub async fn get(&self, url: &str) -> Result<(Url, String), FetchError> {
        // Wait for rate limiter before making request
        if let Some(limiter) = &self.rate_limiter {
            limiter.until_ready().await;
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        Ok((final_url, body))
    }

    /// One retrieval of `url`; no retries.
    ///
    /// The record describes the page where redirects ended, which must stay
    /// on the same site.
    pub async fn fetch(&self, url: &str) -> Result<PageRecord, FetchError> {
        let page_url = Url::parse(url).map_err(|e| FetchError::Parse {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let (final_url, html) = self.get(url).await?;
        if !is_same_site(&page_url, &final_url) {
            return Err(FetchError::OffSite {
                url: url.to_string(),
                target: final_url.to_string(),
            });
        }
        if html.trim().is_empty() {
            return Err(FetchError::Parse {
                url: url.to_string(),
                message: "empty response body".to_string(),
            });
        }

        if normalize_url(&final_url) != normalize_url(&page_url) {
            tracing::debug!(url = %url, target = %final_url, "Followed redirect");
        }
        tracing::debug!(url = %final_url, bytes = html.len(), "Fetched page over HTTP");
        Ok(parse_page(&final_url, &html))
    }
}
