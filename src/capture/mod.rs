//! Render service seam: turn an HTML document into PNG bytes.

use crate::config::CaptureConfig;
use crate::Result;
use futures::future::BoxFuture;

#[cfg(feature = "cdp")]
pub mod cdp;

#[cfg(feature = "cdp")]
pub use cdp::ChromeRenderer;

/// Everything a render service needs besides the document itself.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureRequest {
    pub geometry: CaptureConfig,
    /// Device scale factor applied to the capture
    pub zoom_factor: f64,
}

/// A backend that rasterizes HTML.
///
/// Implementations return encoded PNG bytes. Any failure is reported as
/// [`crate::Error::RenderError`].
pub trait RenderService: Send + Sync {
    fn render<'a>(&'a self, html: &'a str, request: &'a CaptureRequest) -> BoxFuture<'a, Result<Vec<u8>>>;
}

impl<T: RenderService + ?Sized> RenderService for std::sync::Arc<T> {
    fn render<'a>(&'a self, html: &'a str, request: &'a CaptureRequest) -> BoxFuture<'a, Result<Vec<u8>>> {
        (**self).render(html, request)
    }
}
