//! Highlight theme catalog and CDN URL templating.

use crate::{Error, Result};

/// highlight.js release the stylesheet and script URLs are pinned to.
pub const HLJS_VERSION: &str = "9.10.0";

/// Theme used when the requested name is not in the catalog.
pub const DEFAULT_THEME: &str = "hybrid";

/// Default CDN serving the highlight.js assets.
pub const DEFAULT_CDN_BASE: &str = "https://cdnjs.cloudflare.com";

/// Web font linked unconditionally into every document.
pub const FONT_STYLESHEET_URL: &str = "https://fonts.googleapis.com/css?family=Source+Code+Pro";

// Styles shipped with highlight.js 9.10.0
const CATALOG: &[&str] = &[
    "agate",
    "androidstudio",
    "arduino-light",
    "arta",
    "ascetic",
    "atelier-cave-dark",
    "atelier-cave-light",
    "atelier-dune-dark",
    "atelier-dune-light",
    "atelier-estuary-dark",
    "atelier-estuary-light",
    "atelier-forest-dark",
    "atelier-forest-light",
    "atelier-heath-dark",
    "atelier-heath-light",
    "atelier-lakeside-dark",
    "atelier-lakeside-light",
    "atelier-plateau-dark",
    "atelier-plateau-light",
    "atelier-savanna-dark",
    "atelier-savanna-light",
    "atelier-seaside-dark",
    "atelier-seaside-light",
    "atelier-sulphurpool-dark",
    "atelier-sulphurpool-light",
    "atom-one-dark",
    "atom-one-light",
    "brown-paper",
    "codepen-embed",
    "color-brewer",
    "darcula",
    "dark",
    "darkula",
    "default",
    "docco",
    "dracula",
    "far",
    "foundation",
    "github",
    "github-gist",
    "googlecode",
    "grayscale",
    "gruvbox-dark",
    "gruvbox-light",
    "hopscotch",
    "hybrid",
    "idea",
    "ir-black",
    "kimbie.dark",
    "kimbie.light",
    "magula",
    "mono-blue",
    "monokai",
    "monokai-sublime",
    "obsidian",
    "ocean",
    "paraiso-dark",
    "paraiso-light",
    "pojoaque",
    "purebasic",
    "qtcreator_dark",
    "qtcreator_light",
    "railscasts",
    "rainbow",
    "school-book",
    "solarized-dark",
    "solarized-light",
    "sunburst",
    "tomorrow",
    "tomorrow-night",
    "tomorrow-night-blue",
    "tomorrow-night-bright",
    "tomorrow-night-eighties",
    "vs",
    "xcode",
    "xt256",
    "zenburn",
];

/// A validated highlight theme.
///
/// Construction never fails: names outside the catalog resolve to
/// [`DEFAULT_THEME`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    name: &'static str,
}

impl Theme {
    /// Resolve a free-form theme name (case-insensitive).
    pub fn resolve(name: &str) -> Self {
        let wanted = name.trim().to_lowercase();
        match CATALOG.iter().find(|n| **n == wanted) {
            Some(n) => Self { name: n },
            None => {
                log::debug!("Unknown theme '{}', using '{}'", name, DEFAULT_THEME);
                Self::default()
            }
        }
    }

    /// Every supported theme name.
    pub fn catalog() -> &'static [&'static str] {
        CATALOG
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// File name of the minified stylesheet, e.g. `hybrid.min.css`.
    pub fn stylesheet_file(&self) -> String {
        format!("{}.min.css", self.name)
    }

    /// Stylesheet URL under the given CDN base.
    pub fn stylesheet_url(&self, cdn_base: &str) -> Result<String> {
        cdn_join(
            cdn_base,
            &format!(
                "ajax/libs/highlight.js/{}/styles/{}",
                HLJS_VERSION,
                self.stylesheet_file()
            ),
        )
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            name: DEFAULT_THEME,
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// URL of the highlight.js script. Versioned, but the same for every theme.
pub fn script_url(cdn_base: &str) -> Result<String> {
    cdn_join(
        cdn_base,
        &format!("ajax/libs/highlight.js/{}/highlight.min.js", HLJS_VERSION),
    )
}

fn cdn_join(cdn_base: &str, path: &str) -> Result<String> {
    let mut base = url::Url::parse(cdn_base)
        .map_err(|e| Error::ConfigError(format!("Invalid CDN base '{}': {}", cdn_base, e)))?;
    // Keep any path prefix on the base (e.g. a local mirror under /mirror)
    if !base.path().ends_with('/') {
        let p = format!("{}/", base.path());
        base.set_path(&p);
    }
    base.join(path)
        .map(|u| u.to_string())
        .map_err(|e| Error::ConfigError(format!("Invalid CDN path '{}': {}", path, e)))
}
