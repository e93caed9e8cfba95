//! Bot-challenge page detection.

const CHALLENGE_INDICATORS: &[&str] = &[
    "just a moment",
    "checking your browser",
    "please wait",
    "cloudflare",
    "ddos protection",
    "access denied",
    "challenge",
    "security check",
];

/// How much of the body is inspected; challenge copy sits at the top.
pub const BODY_PREFIX_CHARS: usize = 500;

/// True when the title or the start of the body reads like an anti-bot
/// interstitial rather than the site itself.
pub fn is_protection_page(title: &str, text: &str) -> bool {
    let title = title.to_lowercase();
    let prefix: String = text.chars().take(BODY_PREFIX_CHARS).collect();
    let prefix = prefix.to_lowercase();

    CHALLENGE_INDICATORS
        .iter()
        .any(|indicator| title.contains(indicator) || prefix.contains(indicator))
}
