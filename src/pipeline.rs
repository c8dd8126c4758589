//! Capture orchestration: source file in, framed PNG out.

use crate::background::BackgroundFetcher;
use crate::capture::{CaptureRequest, RenderService};
use crate::config::{resolve_input_path, resolve_output_path, RenderConfig, RenderOptions};
use crate::html::synthesize;
use crate::postprocess::post_process;
use crate::prettify::{DefaultPrettifier, Prettifier, SourceKind};
use crate::{Error, Result};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Drives one render per call to [`Snipper::render`].
///
/// The render service and pretty-printer are injected so tests and
/// embedders can swap either one.
#[derive(Clone)]
pub struct Snipper {
    renderer: Arc<dyn RenderService>,
    prettifier: Arc<dyn Prettifier>,
}

impl Snipper {
    pub fn new(renderer: impl RenderService + 'static) -> Self {
        Self::with_prettifier(renderer, DefaultPrettifier::default())
    }

    pub fn with_prettifier(renderer: impl RenderService + 'static, prettifier: impl Prettifier + 'static) -> Self {
        Self {
            renderer: Arc::new(renderer),
            prettifier: Arc::new(prettifier),
        }
    }

    /// Render `path` to an image and return where it was written.
    ///
    /// The theme's background is fetched concurrently with reading, formatting
    /// and capturing the source, and joined before the image is framed. A
    /// fetch that fails only costs the theme color; every other failure
    /// aborts the run.
    pub async fn render(&self, path: impl AsRef<Path>, options: RenderOptions) -> Result<PathBuf> {
        let path = path.as_ref();
        let config = RenderConfig::merge(options)?;
        let input = resolve_input_path(path)?;
        let output = resolve_output_path(path, config.output.as_deref())?;

        let background = self.spawn_background_fetch(&config)?;

        let bytes = tokio::fs::read(&input)
            .await
            .map_err(|e| Error::InputReadError(format!("{}: {}", input.display(), e)))?;
        let mut source = String::from_utf8_lossy(&bytes).into_owned();

        if config.prettify {
            let kind = SourceKind::from_path(&input);
            source = self.prettifier.format(&source, kind)?;
            debug!("Formatted {} as {:?}", input.display(), kind);
        }

        let html = synthesize(&source, &config)?;
        let request = CaptureRequest {
            geometry: config.capture.clone(),
            zoom_factor: config.zoom_factor(),
        };
        let png = self.renderer.render(&html, &request).await?;

        tokio::fs::write(&output, &png)
            .await
            .map_err(|e| Error::ImageError(format!("Failed to write {}: {}", output.display(), e)))?;

        let config = match join_background(background).await {
            Some(bg) => config.with_background(bg),
            None => config,
        };
        let color = config.border_color()?;

        let target = output.clone();
        tokio::task::spawn_blocking(move || post_process(&target, color))
            .await
            .map_err(|e| Error::ImageError(format!("Post-processing canceled: {}", e)))??;

        info!("Image successfully saved as {}", output.display());
        Ok(output)
    }

    fn spawn_background_fetch(&self, config: &RenderConfig) -> Result<Option<JoinHandle<Option<String>>>> {
        if config.background.is_some() {
            return Ok(None);
        }
        let css_url = config.theme.stylesheet_url(&config.cdn_base)?;
        let fetcher = match BackgroundFetcher::new(config.fetch_timeout_ms) {
            Ok(f) => f,
            Err(e) => {
                warn!("Background extraction skipped: {}", e);
                return Ok(None);
            }
        };
        Ok(Some(tokio::spawn(async move { fetcher.fetch(&css_url).await })))
    }
}

async fn join_background(handle: Option<JoinHandle<Option<String>>>) -> Option<String> {
    match handle?.await {
        Ok(bg) => bg,
        Err(e) => {
            warn!("Background fetch task failed: {}", e);
            None
        }
    }
}
