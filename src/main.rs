use anyhow::Context;
use clap::Parser;
use codesnap::{RenderOptions, Theme};
use std::path::PathBuf;

/// Render a source file into a bordered, syntax-highlighted PNG.
#[derive(Parser, Debug)]
#[command(name = "codesnap", version, about)]
struct Cli {
    /// Source file to render
    #[arg(required_unless_present = "list_themes")]
    file: Option<PathBuf>,

    /// highlight.js theme name (unknown names fall back to hybrid)
    #[arg(short, long)]
    theme: Option<String>,

    #[arg(long)]
    font: Option<String>,

    /// Font size in pixels
    #[arg(long)]
    font_size: Option<u32>,

    /// Border color; skips reading it from the theme stylesheet
    #[arg(short, long)]
    background: Option<String>,

    /// Output path (default: <FILE>.png)
    #[arg(short, long)]
    output: Option<String>,

    /// Zoom factor for the capture
    #[arg(short, long)]
    resolution: Option<f64>,

    /// CSS that replaces the generated code style rule
    #[arg(long)]
    style: Option<String>,

    /// Render the source as is, without pretty-printing
    #[arg(long)]
    no_prettify: bool,

    /// Embed the source without HTML escaping
    #[arg(long)]
    raw_html: bool,

    /// JSON options file; flags given on the command line take precedence
    #[arg(long, value_name = "JSON")]
    options: Option<PathBuf>,

    /// Print the available themes and exit
    #[arg(long)]
    list_themes: bool,
}

impl Cli {
    fn render_options(&self) -> anyhow::Result<RenderOptions> {
        let base = match &self.options {
            Some(path) => RenderOptions::from_json_file(path)?,
            None => RenderOptions::default(),
        };
        Ok(RenderOptions {
            theme: self.theme.clone().or(base.theme),
            font: self.font.clone().or(base.font),
            font_size: self.font_size.or(base.font_size),
            background: self.background.clone().or(base.background),
            output: self.output.clone().or(base.output),
            resolution: self.resolution.or(base.resolution),
            style: self.style.clone().or(base.style),
            prettify: if self.no_prettify { Some(false) } else { base.prettify },
            escape_html: if self.raw_html { Some(false) } else { base.escape_html },
            ..base
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.list_themes {
        for name in Theme::catalog() {
            println!("{}", name);
        }
        return Ok(());
    }

    let file = cli.file.clone().context("No input file given")?;
    let options = cli.render_options()?;
    let saved = codesnap::render(&file, options)
        .await
        .with_context(|| format!("Failed to render {}", file.display()))?;

    println!("Image successfully saved as {}", saved.display());
    Ok(())
}
