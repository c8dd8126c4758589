//! HTML document synthesis.

use crate::theme::{script_url, FONT_STYLESHEET_URL};
use crate::{RenderConfig, Result};

/// Build the page the renderer captures.
///
/// Pure: the same source and config always give the same document. The
/// source goes inside `<pre><code>`, HTML-escaped unless
/// `config.escape_html` is off.
pub fn synthesize(source: &str, config: &RenderConfig) -> Result<String> {
    let css_url = config.theme.stylesheet_url(&config.cdn_base)?;
    let script = script_url(&config.cdn_base)?;
    let style = style_block(config);
    let code = if config.escape_html {
        escape(source)
    } else {
        source.to_string()
    };

    Ok(format!(
        r#"<html>
    <head>
        <style>
            {style}
        </style>
        <link href="{font}" rel="stylesheet">
        <link rel="stylesheet" href="{css}" />
        <script src="{script}"></script>
        <script>hljs.initHighlightingOnLoad();</script>
    </head>
    <body>
    <pre>
    <code>{code}</code>
    </pre>
    </body>
</html>
"#,
        style = style,
        font = FONT_STYLESHEET_URL,
        css = css_url,
        script = script,
        code = code,
    ))
}

/// The override style, or a `code{...}` rule from the font settings.
pub fn style_block(config: &RenderConfig) -> String {
    match &config.style {
        Some(style) => style.clone(),
        None => format!(
            "code{{font-family: '{}'; font-size:{}px; padding:20px}}",
            config.font, config.font_size
        ),
    }
}

fn escape(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    for c in source.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
