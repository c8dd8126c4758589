//! Chrome DevTools Protocol render service (uses the `headless_chrome` crate)
//!
//! `headless_chrome` is blocking, so a dedicated worker thread owns the
//! browser and async callers talk to it over a channel, receiving results on
//! a `oneshot`.

use crate::capture::{CaptureRequest, RenderService};
use crate::config::Size;
use crate::{Error, Result};
use base64::Engine as Base64Engine;
use futures::future::BoxFuture;
use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::{Browser, LaunchOptions};
use log::{debug, warn};
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Duration;
use tokio::sync::oneshot;

// Keep the browser alive between captures driven by the same renderer
const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(300);

enum Command {
    Capture(String, CaptureRequest, oneshot::Sender<Result<Vec<u8>>>),
    Close(oneshot::Sender<Result<()>>),
}

/// Headless Chrome renderer.
///
/// The browser is launched lazily on the first capture and relaunched when a
/// request asks for a different window size.
pub struct ChromeRenderer {
    cmd_tx: Sender<Command>,
}

impl ChromeRenderer {
    /// Spawn the worker thread. Chrome itself starts on first use.
    pub fn new() -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();

        thread::spawn(move || {
            let mut session: Option<(Size, Browser)> = None;

            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    Command::Capture(html, request, resp) => {
                        let res = capture(&mut session, &html, &request);
                        if res.is_err() {
                            // a failed browser is not reused
                            session = None;
                        }
                        let _ = resp.send(res);
                    }
                    Command::Close(resp) => {
                        drop(session.take());
                        let _ = resp.send(Ok(()));
                        break;
                    }
                }
            }
        });

        Self { cmd_tx }
    }

    /// Shut down the worker and the browser it owns.
    pub async fn close(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        let _ = self.cmd_tx.send(Command::Close(tx));
        rx.await
            .map_err(|e| Error::Other(format!("Close canceled: {}", e)))?
    }
}

impl Default for ChromeRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderService for ChromeRenderer {
    fn render<'a>(&'a self, html: &'a str, request: &'a CaptureRequest) -> BoxFuture<'a, Result<Vec<u8>>> {
        Box::pin(async move {
            let (tx, rx) = oneshot::channel();
            self.cmd_tx
                .send(Command::Capture(html.to_string(), request.clone(), tx))
                .map_err(|_| Error::RenderError("Render worker has stopped".into()))?;
            rx.await
                .map_err(|e| Error::RenderError(format!("Capture canceled: {}", e)))?
        })
    }
}

fn launch(window: Size) -> Result<Browser> {
    let launch_options = LaunchOptions::default_builder()
        .headless(true)
        .window_size(Some((window.width, window.height)))
        .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
        .build()
        .map_err(|e| Error::RenderError(format!("Failed to build launch options: {}", e)))?;

    debug!("Launching headless Chrome at {}x{}", window.width, window.height);
    Browser::new(launch_options)
        .map_err(|e| Error::RenderError(format!("Failed to launch browser: {}", e)))
}

fn capture(session: &mut Option<(Size, Browser)>, html: &str, request: &CaptureRequest) -> Result<Vec<u8>> {
    let window = request.geometry.window_size;
    if session.as_ref().map(|(size, _)| *size) != Some(window) {
        *session = Some((window, launch(window)?));
    }
    let browser = match session {
        Some((_, browser)) => browser,
        None => return Err(Error::RenderError("Browser session unavailable".into())),
    };

    let tab = browser.new_tab()?;

    let result = capture_in_tab(&tab, html, request);
    if let Err(e) = tab.close(false) {
        warn!("Failed to close capture tab: {}", e);
    }
    result
}

fn capture_in_tab(tab: &Tab, html: &str, request: &CaptureRequest) -> Result<Vec<u8>> {
    let encoded = Base64Engine::encode(&base64::engine::general_purpose::STANDARD, html);
    let url = format!("data:text/html;charset=utf-8;base64,{}", encoded);

    tab.navigate_to(&url)
        .map_err(|e| Error::RenderError(format!("Navigation failed: {}", e)))?;
    tab.wait_until_navigated()
        .map_err(|e| Error::RenderError(format!("Wait for navigation failed: {}", e)))?;

    // Let the highlighter and web fonts settle
    let delay = request.geometry.render_delay_ms;
    if delay > 0 {
        thread::sleep(Duration::from_millis(delay));
    }

    let (content_w, content_h) = if request.geometry.needs_content_size() {
        content_size(tab)?
    } else {
        (0, 0)
    };
    let clip = request.geometry.clip(content_w, content_h);
    if clip.width == 0 || clip.height == 0 {
        return Err(Error::RenderError(format!(
            "Capture area is empty ({}x{}) after offsets",
            clip.width, clip.height
        )));
    }

    let viewport = Page::Viewport {
        x: f64::from(clip.x),
        y: f64::from(clip.y),
        width: f64::from(clip.width),
        height: f64::from(clip.height),
        scale: request.zoom_factor,
    };

    tab.capture_screenshot(Page::CaptureScreenshotFormatOption::Png, None, Some(viewport), true)
        .map_err(|e| Error::RenderError(format!("Screenshot failed: {}", e)))
}

fn content_size(tab: &Tab) -> Result<(u32, u32)> {
    let eval = tab
        .evaluate(
            r#"JSON.stringify([document.documentElement.scrollWidth, document.documentElement.scrollHeight])"#,
            false,
        )
        .map_err(|e| Error::RenderError(format!("Evaluation failed: {}", e)))?;

    let raw = eval
        .value
        .and_then(|v| v.as_str().map(|s| s.to_string()))
        .ok_or_else(|| Error::RenderError("No value returned from size evaluation".into()))?;

    let dims: Vec<u32> = serde_json::from_str(&raw)
        .map_err(|e| Error::RenderError(format!("Unexpected page size '{}': {}", raw, e)))?;
    match dims.as_slice() {
        [w, h] => Ok((*w, *h)),
        _ => Err(Error::RenderError(format!("Unexpected page size '{}'", raw))),
    }
}
