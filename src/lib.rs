//! Codesnap
//!
//! Renders a source file to a syntax-highlighted PNG snapshot. The source is
//! optionally pretty-printed, embedded in an HTML page styled by a
//! highlight.js theme, rasterized by a headless browser, then trimmed and
//! framed with the theme's background color.
//!
//! # Features
//!
//! - **CDP Backend** (default): renders through headless Chrome
//! - **Pluggable seams**: bring your own [`RenderService`] or [`Prettifier`]
//!
//! # Example
//!
//! ```no_run
//! use codesnap::RenderOptions;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = RenderOptions {
//!     theme: Some("monokai".to_string()),
//!     ..Default::default()
//! };
//! let saved = codesnap::render("demo.js", options).await?;
//! println!("Saved {}", saved.display());
//! # Ok(())
//! # }
//! ```

pub mod background;
pub mod capture;
pub mod color;
pub mod config;
pub mod error;
pub mod html;
pub mod pipeline;
pub mod postprocess;
pub mod prettify;
pub mod theme;

pub use capture::{CaptureRequest, RenderService};
pub use config::{CaptureConfig, CaptureOptions, RenderConfig, RenderOptions, ShotExtent};
pub use error::{Error, Result};
pub use pipeline::Snipper;
pub use prettify::{DefaultPrettifier, Prettifier, SourceKind};
pub use theme::Theme;

#[cfg(feature = "cdp")]
pub use capture::ChromeRenderer;

/// Render `path` with the default headless Chrome backend.
///
/// Returns the path of the written image.
#[cfg(feature = "cdp")]
pub async fn render(path: impl AsRef<std::path::Path>, options: RenderOptions) -> Result<std::path::PathBuf> {
    Snipper::new(ChromeRenderer::new()).render(path, options).await
}
