//! Render configuration: built-in defaults, caller overrides, and the merge
//! between them.

use crate::color::parse_css_color;
use crate::theme::{Theme, DEFAULT_CDN_BASE};
use crate::{Error, Result};
use image::Rgba;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Zoom factor used when the configured resolution is not positive.
pub const DEFAULT_ZOOM_FACTOR: f64 = 2.5;

/// Resolved options for a single render
///
/// Built once per invocation with [`RenderConfig::merge`] and never mutated
/// afterwards. Stages that need a different value derive a new config (see
/// [`RenderConfig::with_background`]).
///
/// # Examples
///
/// ```
/// let cfg = codesnap::RenderConfig::default();
/// assert_eq!(cfg.theme.name(), "hybrid");
/// assert_eq!(cfg.font_size, 20);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Zoom factor applied when rasterizing
    pub resolution: f64,
    pub theme: Theme,
    pub font: String,
    /// Font size in CSS pixels
    pub font_size: u32,
    /// Explicit border color; `None` lets the theme stylesheet decide
    pub background: Option<String>,
    /// Output image path; `None` derives `<input>.png`
    pub output: Option<String>,
    /// Whether to run the pretty-printer before rendering
    pub prettify: bool,
    /// Replaces the generated `code{...}` rule when set
    pub style: Option<String>,
    /// Escape HTML-special characters in the embedded source
    pub escape_html: bool,
    /// Base URL the highlight.js assets are fetched from
    pub cdn_base: String,
    /// Timeout for the stylesheet fetch in milliseconds
    pub fetch_timeout_ms: u64,
    pub capture: CaptureConfig,
}

impl RenderConfig {
    /// Background used when neither an override nor the stylesheet provides one.
    pub const FALLBACK_BACKGROUND: &'static str = "#fff";

    /// Merge caller options over the built-in defaults (caller values win).
    pub fn merge(options: RenderOptions) -> Result<Self> {
        Self::default().merged_with(options)
    }

    /// Merge caller options over this config, returning a new value.
    pub fn merged_with(&self, options: RenderOptions) -> Result<Self> {
        if let Some(bg) = options.background.as_deref() {
            if parse_css_color(bg).is_none() {
                return Err(Error::ConfigError(format!("Unrecognized background color '{}'", bg)));
            }
        }
        if let Some(base) = options.cdn_base.as_deref() {
            url::Url::parse(base)
                .map_err(|e| Error::ConfigError(format!("Invalid CDN base '{}': {}", base, e)))?;
        }

        let base = self.clone();
        Ok(Self {
            resolution: options.resolution.unwrap_or(base.resolution),
            theme: options
                .theme
                .as_deref()
                .map(Theme::resolve)
                .unwrap_or(base.theme),
            font: options.font.unwrap_or(base.font),
            font_size: options.font_size.unwrap_or(base.font_size),
            background: options.background.or(base.background),
            output: options.output.or(base.output),
            prettify: options.prettify.unwrap_or(base.prettify),
            style: options.style.or(base.style),
            escape_html: options.escape_html.unwrap_or(base.escape_html),
            cdn_base: options.cdn_base.unwrap_or(base.cdn_base),
            fetch_timeout_ms: options.fetch_timeout_ms.unwrap_or(base.fetch_timeout_ms),
            capture: base.capture.merged_with(options.capture.unwrap_or_default()),
        })
    }

    /// Derive a config whose background is `background`, leaving `self` as is.
    pub fn with_background(&self, background: impl Into<String>) -> Self {
        Self {
            background: Some(background.into()),
            ..self.clone()
        }
    }

    /// Zoom factor handed to the render service.
    pub fn zoom_factor(&self) -> f64 {
        if self.resolution > 0.0 {
            self.resolution
        } else {
            DEFAULT_ZOOM_FACTOR
        }
    }

    /// Border color for post-processing: the override if any, else `#fff`.
    pub fn border_color(&self) -> Result<Rgba<u8>> {
        let text = self.background.as_deref().unwrap_or(Self::FALLBACK_BACKGROUND);
        parse_css_color(text)
            .ok_or_else(|| Error::ConfigError(format!("Unrecognized background color '{}'", text)))
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            theme: Theme::default(),
            font: "Source Code Pro".to_string(),
            font_size: 20,
            background: None,
            output: None,
            prettify: true,
            style: None,
            escape_html: true,
            cdn_base: DEFAULT_CDN_BASE.to_string(),
            fetch_timeout_ms: 30000,
            capture: CaptureConfig::default(),
        }
    }
}

/// Capture geometry: browser window, shot extent and crop offsets.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureConfig {
    pub window_size: Size,
    pub shot_size: ShotSize,
    pub shot_offset: ShotOffset,
    /// Time to let highlight.js run after navigation, in milliseconds
    pub render_delay_ms: u64,
}

impl CaptureConfig {
    fn merged_with(self, options: CaptureOptions) -> Self {
        let window = options.window_size.unwrap_or_default();
        let shot = options.shot_size.unwrap_or_default();
        let offset = options.shot_offset.unwrap_or_default();
        Self {
            window_size: Size {
                width: window.width.unwrap_or(self.window_size.width),
                height: window.height.unwrap_or(self.window_size.height),
            },
            shot_size: ShotSize {
                width: shot.width.unwrap_or(self.shot_size.width),
                height: shot.height.unwrap_or(self.shot_size.height),
            },
            shot_offset: ShotOffset {
                top: offset.top.unwrap_or(self.shot_offset.top),
                right: offset.right.unwrap_or(self.shot_offset.right),
                bottom: offset.bottom.unwrap_or(self.shot_offset.bottom),
                left: offset.left.unwrap_or(self.shot_offset.left),
            },
            render_delay_ms: options.render_delay.unwrap_or(self.render_delay_ms),
        }
    }

    /// Crop rectangle for a page whose laid-out content measures
    /// `content_width` x `content_height` CSS pixels.
    pub fn clip(&self, content_width: u32, content_height: u32) -> ClipRect {
        let extent = |e: ShotExtent, window: u32, content: u32| match e {
            ShotExtent::Window => window,
            ShotExtent::All => content.max(window),
            ShotExtent::Pixels(px) => px,
        };
        let width = extent(self.shot_size.width, self.window_size.width, content_width);
        let height = extent(self.shot_size.height, self.window_size.height, content_height);
        let o = &self.shot_offset;
        ClipRect {
            x: o.left,
            y: o.top,
            width: width.saturating_sub(o.left).saturating_sub(o.right),
            height: height.saturating_sub(o.top).saturating_sub(o.bottom),
        }
    }

    /// Whether capturing needs the document's full laid-out size.
    pub fn needs_content_size(&self) -> bool {
        self.shot_size.width == ShotExtent::All || self.shot_size.height == ShotExtent::All
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            window_size: Size {
                width: 1024,
                height: 768,
            },
            shot_size: ShotSize::default(),
            shot_offset: ShotOffset::default(),
            render_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShotSize {
    pub width: ShotExtent,
    pub height: ShotExtent,
}

/// How far a shot extends along one axis: the window, the whole document,
/// or a fixed pixel count. Deserializes from `"window"`, `"all"` or a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShotExtent {
    #[default]
    Window,
    All,
    Pixels(u32),
}

impl<'de> Deserialize<'de> for ShotExtent {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ExtentVisitor;

        impl<'de> serde::de::Visitor<'de> for ExtentVisitor {
            type Value = ShotExtent;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("\"window\", \"all\" or a pixel count")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> std::result::Result<ShotExtent, E> {
                match v {
                    "window" => Ok(ShotExtent::Window),
                    "all" => Ok(ShotExtent::All),
                    other => Err(E::invalid_value(serde::de::Unexpected::Str(other), &self)),
                }
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> std::result::Result<ShotExtent, E> {
                u32::try_from(v)
                    .map(ShotExtent::Pixels)
                    .map_err(|_| E::invalid_value(serde::de::Unexpected::Unsigned(v), &self))
            }
        }

        deserializer.deserialize_any(ExtentVisitor)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShotOffset {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

/// Crop rectangle in CSS pixels (before the zoom factor is applied).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Caller-supplied overrides. Every field is optional; `None` keeps the default.
///
/// Keys follow the camelCase names of the options object this tool has always
/// accepted, so existing JSON option files keep working.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RenderOptions {
    pub resolution: Option<f64>,
    pub theme: Option<String>,
    pub font: Option<String>,
    pub font_size: Option<u32>,
    pub background: Option<String>,
    pub output: Option<String>,
    pub prettify: Option<bool>,
    pub style: Option<String>,
    pub escape_html: Option<bool>,
    pub cdn_base: Option<String>,
    pub fetch_timeout_ms: Option<u64>,
    #[serde(alias = "webshotCustomConfig")]
    pub capture: Option<CaptureOptions>,
}

impl RenderOptions {
    /// Load options from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read options file {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&text).map_err(|e| {
            Error::ConfigError(format!("Invalid options file {}: {}", path.display(), e))
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOptions {
    pub window_size: Option<SizeOptions>,
    pub shot_size: Option<ShotSizeOptions>,
    pub shot_offset: Option<ShotOffsetOptions>,
    pub render_delay: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SizeOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShotSizeOptions {
    pub width: Option<ShotExtent>,
    pub height: Option<ShotExtent>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ShotOffsetOptions {
    pub top: Option<u32>,
    pub right: Option<u32>,
    pub bottom: Option<u32>,
    pub left: Option<u32>,
}

/// Resolve the input path against the current directory.
pub fn resolve_input_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir()
        .map_err(|e| Error::InputReadError(format!("Failed to resolve current directory: {}", e)))?;
    Ok(cwd.join(path))
}

/// Where the image for `input` is written.
///
/// Without an explicit output this is the absolute input path with `.png`
/// appended; otherwise the given path with a leading `~` expanded.
pub fn resolve_output_path(input: &Path, output: Option<&str>) -> Result<PathBuf> {
    match output {
        None => {
            let mut s = resolve_input_path(input)?.into_os_string();
            s.push(".png");
            Ok(PathBuf::from(s))
        }
        Some(out) => expand_home(out),
    }
}

/// Expand a leading `~` or `~/` to the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    let rest = if path == "~" {
        ""
    } else if let Some(rest) = path.strip_prefix("~/") {
        rest
    } else {
        return Ok(PathBuf::from(path));
    };
    let dirs = directories::BaseDirs::new()
        .ok_or_else(|| Error::ConfigError("Unable to determine home directory".into()))?;
    Ok(dirs.home_dir().join(rest))
}
