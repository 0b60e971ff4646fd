//! Web page scraping.
//!
//! Pages are rendered with a headless browser so JavaScript-driven content is
//! present in the DOM, then reduced to whitespace-normalized body text.

use crate::error::{FortellError, Result};
use async_trait::async_trait;
use regex::Regex;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Trait for page scrapers.
#[async_trait]
pub trait Scraper: Send + Sync {
    /// Fetch a URL and return its rendered, whitespace-normalized body text.
    async fn scrape(&self, url: &str) -> Result<String>;
}

/// Scraper backed by a headless Chromium invocation.
pub struct HeadlessScraper {
    browser_binary: String,
    timeout: Duration,
}

impl HeadlessScraper {
    pub fn new(browser_binary: &str, timeout_seconds: u64) -> Self {
        Self {
            browser_binary: browser_binary.to_string(),
            timeout: Duration::from_secs(timeout_seconds),
        }
    }
}

#[async_trait]
impl Scraper for HeadlessScraper {
    #[instrument(skip(self), fields(url = %url))]
    async fn scrape(&self, url: &str) -> Result<String> {
        let parsed = url::Url::parse(url)
            .map_err(|e| FortellError::InvalidInput(format!("Invalid URL '{}': {}", url, e)))?;
        match parsed.scheme() {
            "http" | "https" => {}
            other => {
                return Err(FortellError::InvalidInput(format!(
                    "Unsupported URL scheme: {}",
                    other
                )))
            }
        }

        info!("Scraping {}", url);

        let result = tokio::time::timeout(
            self.timeout,
            Command::new(&self.browser_binary)
                .arg("--headless=new")
                .arg("--disable-gpu")
                .arg("--no-sandbox")
                .arg("--virtual-time-budget=10000")
                .arg("--dump-dom")
                .arg(url)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .output(),
        )
        .await
        .map_err(|_| FortellError::Scrape(format!("Timed out after {:?}", self.timeout)))?;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FortellError::ToolNotFound(self.browser_binary.clone()));
            }
            Err(e) => {
                return Err(FortellError::Scrape(format!(
                    "Browser execution failed: {e}"
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FortellError::Scrape(format!("Browser failed: {stderr}")));
        }

        let html = String::from_utf8_lossy(&output.stdout);
        let text = extract_body_text(&html);

        if text.is_empty() {
            return Err(FortellError::Scrape("Page body contained no text".into()));
        }

        debug!("Scraped {} characters of body text", text.len());
        Ok(text)
    }
}

/// Reduce rendered HTML to the visible body text, single-spaced and trimmed.
///
/// Script, style and noscript subtrees are excluded; everything else under
/// `<body>` contributes its text nodes in document order.
pub fn extract_body_text(html: &str) -> String {
    let document = scraper::Html::parse_document(html);
    let body_selector =
        scraper::Selector::parse("body").unwrap_or_else(|_| unreachable!("static selector"));

    let Some(body) = document.select(&body_selector).next() else {
        return String::new();
    };

    let mut raw = String::new();
    for node in body.descendants() {
        if let scraper::Node::Text(text) = node.value() {
            let hidden = node.ancestors().any(|a| match a.value() {
                scraper::Node::Element(el) => {
                    matches!(el.name(), "script" | "style" | "noscript")
                }
                _ => false,
            });
            if !hidden {
                raw.push_str(text);
                raw.push(' ');
            }
        }
    }

    normalize_whitespace(&raw)
}

/// Collapse all whitespace runs to single spaces and trim.
pub fn normalize_whitespace(text: &str) -> String {
    let re = Regex::new(r"\s+").unwrap_or_else(|_| unreachable!("static regex"));
    re.replace_all(text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_body_text_strips_markup() {
        let html = r#"<html><head><title>T</title><style>p { color: red; }</style></head>
            <body><h1>Hello</h1><p>World   of
            text</p><script>var x = 1;</script></body></html>"#;
        let text = extract_body_text(html);
        assert!(text.contains("Hello"));
        assert!(text.contains("World of text"));
        assert!(!text.contains("color"));
        assert!(!text.contains("var x"));
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a\t\tb\n\nc  "), "a b c");
        assert_eq!(normalize_whitespace(""), "");
    }

    #[tokio::test]
    async fn test_rejects_non_http_url() {
        let scraper = HeadlessScraper::new("chromium", 5);
        let err = scraper.scrape("file:///etc/passwd").await.unwrap_err();
        assert!(matches!(err, FortellError::InvalidInput(_)));
    }
}
