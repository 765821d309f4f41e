//! Text provider gateway.
//!
//! Room logic never talks to the generator directly; it goes through the
//! [`TextProvider`] trait so the transport (direct Gemini call vs. delegated
//! HTTP fetch) stays swappable. Every provider call is bounded by the
//! configured timeout and is never retried.

mod gemini;
mod upstream;

pub use gemini::GeminiProvider;
pub use upstream::UpstreamProvider;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors that can occur while fetching a passage
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Response parsing failed: {0}")]
    ParseError(String),
}

/// Target passage length in words.
pub const PASSAGE_WORDS: u32 = 200;

/// A one-shot source of cleaned typing passages.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Fetch one passage: plain text, single line, markdown stripped.
    async fn fetch_passage(&self) -> GatewayResult<String>;

    /// Get the name of this provider
    fn name(&self) -> &str;
}

/// Configuration for the text provider gateway
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Gemini API key for the direct provider
    pub api_key: Option<String>,
    /// Secondary endpoint URL; takes precedence over the direct provider
    pub upstream_url: Option<String>,
    /// Generator model to use
    pub model: String,
    /// Maximum wait for the generator before declaring failure
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            upstream_url: None,
            model: "gemini-2.5-flash".to_string(),
            timeout: Duration::from_secs(3),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let api_key = std::env::var("GEMINI_API_KEY").ok().and_then(|key| {
            let trimmed = key.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        });

        let upstream_url = std::env::var("GEMINI_URL").ok().and_then(|url| {
            let trimmed = url.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        });

        let model = std::env::var("GEMINI_MODEL")
            .ok()
            .and_then(|model| {
                let trimmed = model.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .unwrap_or_else(|| "gemini-2.5-flash".to_string());

        let timeout = std::env::var("GATEWAY_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(3));

        Self {
            api_key,
            upstream_url,
            model,
            timeout,
        }
    }

    /// Build the configured provider. The delegated endpoint wins when both
    /// are set.
    pub fn build_provider(&self) -> GatewayResult<Arc<dyn TextProvider>> {
        if let Some(url) = &self.upstream_url {
            return Ok(Arc::new(UpstreamProvider::new(url.clone(), self.timeout)));
        }
        if let Some(api_key) = &self.api_key {
            return Ok(Arc::new(GeminiProvider::new(
                api_key.clone(),
                self.model.clone(),
                self.timeout,
            )));
        }
        Err(GatewayError::ConfigError(
            "No text provider configured. Set GEMINI_URL or GEMINI_API_KEY".to_string(),
        ))
    }
}

/// Reduce raw generator output to a single-line plain-text passage.
///
/// Emphasis, heading, list and quote markers are dropped, links and images
/// collapse to their text, and all whitespace runs (blank lines included)
/// fold into single spaces.
pub fn strip_markdown(text: &str) -> String {
    let unlinked = strip_links(text);
    let mut out = String::with_capacity(unlinked.len());
    for c in unlinked.chars() {
        match c {
            '*' | '_' | '~' | '`' | '>' | '#' | '-' => {}
            '\r' | '\n' => out.push(' '),
            c => out.push(c),
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Replace `[text](url)` and `![alt](url)` with the bracketed text.
fn strip_links(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('[') {
        let is_image = rest[..open].ends_with('!');
        let close = match rest[open..].find(']') {
            Some(p) => open + p,
            None => break,
        };
        if rest[close + 1..].starts_with('(') {
            if let Some(end) = rest[close + 2..].find(')') {
                let prefix_end = if is_image { open - 1 } else { open };
                out.push_str(&rest[..prefix_end]);
                out.push_str(&rest[open + 1..close]);
                rest = &rest[close + 2 + end + 1..];
                continue;
            }
        }
        // Bare bracket, keep it literally and move on.
        out.push_str(&rest[..open + 1]);
        rest = &rest[open + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_strip_markdown_removes_markers() {
        assert_eq!(
            strip_markdown("# Hello **world**\n\n- item"),
            "Hello world item"
        );
        assert_eq!(strip_markdown("> quoted `code` _here_"), "quoted code here");
    }

    #[test]
    fn test_strip_markdown_collapses_whitespace() {
        assert_eq!(
            strip_markdown("one\r\n\r\ntwo   three\n\n\nfour"),
            "one two three four"
        );
        assert_eq!(strip_markdown("  padded  "), "padded");
    }

    #[test]
    fn test_strip_markdown_replaces_links_with_text() {
        assert_eq!(
            strip_markdown("see [the docs](https://example.com) here"),
            "see the docs here"
        );
        assert_eq!(strip_markdown("![a chart](img.png) caption"), "a chart caption");
        // Bracket without an adjacent URL is not link syntax.
        assert_eq!(strip_markdown("array[0] (note)"), "array[0] (note)");
    }

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.model, "gemini-2.5-flash");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert!(config.build_provider().is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_prefers_upstream_url() {
        std::env::set_var("GEMINI_API_KEY", "test-key");
        std::env::set_var("GEMINI_URL", "http://localhost:9999/gemini");
        std::env::set_var("GATEWAY_TIMEOUT_SECS", "7");

        let config = GatewayConfig::from_env();
        assert_eq!(config.api_key.as_deref(), Some("test-key"));
        assert_eq!(
            config.upstream_url.as_deref(),
            Some("http://localhost:9999/gemini")
        );
        assert_eq!(config.timeout, Duration::from_secs(7));

        let provider = config.build_provider().unwrap();
        assert_eq!(provider.name(), "upstream");

        std::env::remove_var("GEMINI_API_KEY");
        std::env::remove_var("GEMINI_URL");
        std::env::remove_var("GATEWAY_TIMEOUT_SECS");
    }

    #[test]
    #[serial]
    fn test_from_env_blank_values_are_ignored() {
        std::env::set_var("GEMINI_API_KEY", "  ");
        std::env::set_var("GEMINI_URL", "");

        let config = GatewayConfig::from_env();
        assert!(config.api_key.is_none());
        assert!(config.upstream_url.is_none());
        assert_eq!(config.timeout, Duration::from_secs(3));

        std::env::remove_var("GEMINI_API_KEY");
        std::env::remove_var("GEMINI_URL");
    }
}
