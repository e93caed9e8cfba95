use thiserror::Error;

/// Why a single page could not be fetched.
///
/// Page-scoped variants carry the URL so the crawler can log and skip
/// without any extra bookkeeping.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("could not parse {url}: {message}")]
    Parse { url: String, message: String },

    #[error("{url} redirected off-site to {target}")]
    OffSite { url: String, target: String },

    #[error("{url} is still behind a bot challenge")]
    Protected { url: String },

    #[error("browser unavailable: {0}")]
    BrowserUnavailable(String),
}

impl FetchError {
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if let Some(status) = err.status() {
            FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            FetchError::Network { url, .. }
            | FetchError::Timeout { url }
            | FetchError::Status { url, .. }
            | FetchError::Parse { url, .. }
            | FetchError::OffSite { url, .. }
            | FetchError::Protected { url } => Some(url),
            FetchError::BrowserUnavailable(_) => None,
        }
    }

    /// 401/403/429 are the usual answers of bot protection to plain clients.
    pub fn looks_blocked(&self) -> bool {
        matches!(
            self,
            FetchError::Status {
                status: 401 | 403 | 429,
                ..
            } | FetchError::Protected { .. }
        )
    }

    pub fn is_capability_failure(&self) -> bool {
        matches!(self, FetchError::BrowserUnavailable(_))
    }
}
