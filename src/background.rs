//! Background color extraction from a highlight.js theme stylesheet.
//!
//! The stylesheet is scanned textually rather than parsed: the first `.hljs`
//! rule block is isolated and the color is picked out of its `background`
//! declaration, which may be a shorthand with images and positions around
//! it. Every failure along the way (network, status, missing rule,
//! unparseable color) is reported as `None` so callers keep their current
//! background.

use crate::color::parse_css_color;
use crate::{Error, Result};
use reqwest::Client;
use std::time::Duration;

const HLJS_SELECTOR: &str = ".hljs";

/// Extract the `background` value of the first `.hljs { ... }` rule.
pub fn extract_background(css: &str) -> Option<String> {
    let block = hljs_block(css)?;
    let at = block.find("background")?;
    let decl = &block[at..];
    let colon = decl.find(':')? + 1;
    // The last declaration of a minified rule has no `;`, only the brace
    let end = decl[colon..]
        .find(|c: char| c == ';' || c == '}')
        .map(|i| colon + i)
        .unwrap_or(decl.len());
    let value = decl[colon..end].trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// The color component of a `background` value.
///
/// Shorthands such as `url(./paper.png) repeat #181914` carry other layers;
/// the first component that parses as a color is returned.
pub fn background_color(value: &str) -> Option<String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in value.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth == 0 => {
                parts.push(&value[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&value[start..]);

    parts
        .into_iter()
        .map(|p| p.trim_end_matches(','))
        .filter(|p| !p.is_empty() && !p.starts_with("url("))
        .find(|p| parse_css_color(p).is_some())
        .map(|p| p.to_string())
}

// Body of the first `.hljs{...}` rule (braces included). A bare `.hljs`
// selector is required: `.hljs-keyword{` and `.hljs .x{` do not count.
fn hljs_block(css: &str) -> Option<&str> {
    let mut from = 0;
    while let Some(i) = css[from..].find(HLJS_SELECTOR) {
        let start = from + i;
        let after = &css[start + HLJS_SELECTOR.len()..];
        let trimmed = after.trim_start();
        if trimmed.starts_with('{') {
            let open = css.len() - trimmed.len();
            let close = css[open..].find('}')? + open + 1;
            return Some(&css[open..close]);
        }
        from = start + HLJS_SELECTOR.len();
    }
    None
}

/// Fetches theme stylesheets and pulls their background color.
#[derive(Debug, Clone)]
pub struct BackgroundFetcher {
    client: Client,
}

impl BackgroundFetcher {
    pub fn new(timeout_ms: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| Error::NetworkError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Background declared by the stylesheet at `css_url`, if it can be had.
    ///
    /// Never fails: fetch errors are logged and turned into `None`.
    pub async fn fetch(&self, css_url: &str) -> Option<String> {
        match self.try_fetch(css_url).await {
            Ok(Some(bg)) => {
                log::debug!("Theme background from {}: {}", css_url, bg);
                Some(bg)
            }
            Ok(None) => {
                log::debug!("No usable .hljs background in {}", css_url);
                None
            }
            Err(e) => {
                log::warn!("Background extraction skipped: {}", e);
                None
            }
        }
    }

    async fn try_fetch(&self, css_url: &str) -> Result<Option<String>> {
        let resp = self
            .client
            .get(css_url)
            .send()
            .await
            .map_err(|e| Error::NetworkError(format!("Failed to fetch {}: {}", css_url, e)))?;

        if resp.status() != reqwest::StatusCode::OK {
            return Err(Error::NetworkError(format!(
                "Failed to fetch {}: HTTP {}",
                css_url,
                resp.status()
            )));
        }

        let css = resp
            .text()
            .await
            .map_err(|e| Error::NetworkError(format!("Failed to read stylesheet body: {}", e)))?;

        Ok(extract_background(&css).and_then(|bg| background_color(&bg)))
    }
}
