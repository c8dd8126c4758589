//! End-to-end pipeline tests with a stub render service and a local stylesheet server

use codesnap::{CaptureRequest, Error, RenderOptions, RenderService, Snipper};
use futures::future::BoxFuture;
use image::{ImageFormat, Rgba, RgbaImage};
use std::sync::{Mutex, Once};
use tiny_http::{Response, Server};

static INIT: Once = Once::new();
static HITS: Mutex<Vec<String>> = Mutex::new(Vec::new());

const CODE: Rgba<u8> = Rgba([200, 30, 30, 255]);

fn was_requested(fragment: &str) -> bool {
    HITS.lock()
        .unwrap_or_else(|e| e.into_inner())
        .iter()
        .any(|p| p.contains(fragment))
}

/// Serve a handful of highlight.js theme stylesheets.
///
/// Each test uses its own theme so the request log stays attributable.
fn start_stylesheet_server() -> String {
    INIT.call_once(|| {
        std::thread::spawn(|| {
            let server = Server::http("127.0.0.1:18181").unwrap();
            for request in server.incoming_requests() {
                let path = request.url().to_string();
                // a failed test must not take the server down with it
                HITS.lock().unwrap_or_else(|e| e.into_inner()).push(path.clone());
                let css = match path.as_str() {
                    "/ajax/libs/highlight.js/9.10.0/styles/hybrid.min.css" => Some(
                        ".hljs{display:block;overflow-x:auto;padding:0.5em;background:#1d1f21}.hljs::selection{background:#373b41}",
                    ),
                    "/ajax/libs/highlight.js/9.10.0/styles/monokai.min.css" => {
                        Some(".hljs{display:block;background:#272822;color:#ddd}")
                    }
                    "/ajax/libs/highlight.js/9.10.0/styles/obsidian.min.css" => {
                        Some(".hljs{display:block;background:#282b2e}")
                    }
                    "/ajax/libs/highlight.js/9.10.0/styles/brown-paper.min.css" => Some(
                        ".hljs{display:block;overflow-x:auto;padding:0.5em;background:#b7a68e url(./brown-papersq.png)}",
                    ),
                    "/ajax/libs/highlight.js/9.10.0/styles/zenburn.min.css" => {
                        Some(".hljs{display:block;color:#dcdcdc}.hljs-keyword{background:#3f3f3f}")
                    }
                    _ => None,
                };
                let response = match css {
                    Some(body) => Response::from_string(body).with_header(
                        "Content-Type: text/css; charset=utf-8"
                            .parse::<tiny_http::Header>()
                            .unwrap(),
                    ),
                    None => Response::from_string("Not Found").with_status_code(404),
                };
                let _ = request.respond(response);
            }
        });
        // Give the server time to start
        std::thread::sleep(std::time::Duration::from_millis(100));
    });

    "http://127.0.0.1:18181".to_string()
}

/// Paints a fixed block of "code" on a white page, whatever the HTML
struct StubRenderer;

impl RenderService for StubRenderer {
    fn render<'a>(&'a self, _html: &'a str, request: &'a CaptureRequest) -> BoxFuture<'a, codesnap::Result<Vec<u8>>> {
        Box::pin(async move {
            let clip = request.geometry.clip(0, 0);
            let mut img = RgbaImage::from_pixel(clip.width, clip.height, Rgba([255, 255, 255, 255]));
            for y in 100..140 {
                for x in 50..250 {
                    img.put_pixel(x, y, CODE);
                }
            }
            let mut bytes = std::io::Cursor::new(Vec::new());
            img.write_to(&mut bytes, ImageFormat::Png)
                .map_err(|e| Error::RenderError(e.to_string()))?;
            Ok(bytes.into_inner())
        })
    }
}

fn options(cdn: &str, theme: &str) -> RenderOptions {
    RenderOptions {
        theme: Some(theme.to_string()),
        cdn_base: Some(cdn.to_string()),
        ..Default::default()
    }
}

fn write_source(dir: &tempfile::TempDir, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, text).unwrap();
    path
}

#[tokio::test]
async fn test_theme_background_frames_image() {
    let cdn = start_stylesheet_server();
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(&dir, "demo.js", "function hi(){return \"hi\"}");

    let out = Snipper::new(StubRenderer)
        .render(&src, options(&cdn, "hybrid"))
        .await
        .expect("render failed");

    assert_eq!(out, dir.path().join("demo.js.png"));
    let img = image::open(&out).unwrap().to_rgba8();
    assert_eq!(img.dimensions(), (200 + 40, 40 + 40));
    assert_eq!(*img.get_pixel(0, 0), Rgba([0x1d, 0x1f, 0x21, 255]));
    assert_eq!(*img.get_pixel(239, 79), Rgba([0x1d, 0x1f, 0x21, 255]));
    assert_eq!(*img.get_pixel(20, 20), CODE);
}

#[tokio::test]
async fn test_failed_fetch_keeps_white_border() {
    let cdn = start_stylesheet_server();
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(&dir, "notes.txt", "plain text");

    // github is not served: the fetch gets a 404
    let out = Snipper::new(StubRenderer)
        .render(&src, options(&cdn, "github"))
        .await
        .expect("render failed");

    let img = image::open(&out).unwrap().to_rgba8();
    assert_eq!(*img.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
}

#[tokio::test]
async fn test_stylesheet_without_rule_keeps_white_border() {
    let cdn = start_stylesheet_server();
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(&dir, "notes.txt", "plain text");

    let out = Snipper::new(StubRenderer)
        .render(&src, options(&cdn, "zenburn"))
        .await
        .expect("render failed");

    let img = image::open(&out).unwrap().to_rgba8();
    assert_eq!(*img.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
    // served fine; it is the missing `.hljs` background that keeps white
    assert!(was_requested("zenburn.min.css"));
}

#[tokio::test]
async fn test_shorthand_background_gives_its_color() {
    let cdn = start_stylesheet_server();
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(&dir, "notes.txt", "plain text");

    let out = Snipper::new(StubRenderer)
        .render(&src, options(&cdn, "brown-paper"))
        .await
        .expect("render failed");

    let img = image::open(&out).unwrap().to_rgba8();
    assert_eq!(*img.get_pixel(0, 0), Rgba([0xb7, 0xa6, 0x8e, 255]));
}

#[tokio::test]
async fn test_unreachable_cdn_keeps_white_border() {
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(&dir, "notes.txt", "plain text");
    let opts = RenderOptions {
        fetch_timeout_ms: Some(2000),
        ..options("http://127.0.0.1:9", "hybrid")
    };

    let out = Snipper::new(StubRenderer).render(&src, opts).await.expect("render failed");
    let img = image::open(&out).unwrap().to_rgba8();
    assert_eq!(*img.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
}

#[tokio::test]
async fn test_override_background_skips_fetch() {
    let cdn = start_stylesheet_server();
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(&dir, "demo.js", "let x = 1");
    let opts = RenderOptions {
        background: Some("rgb(0, 255, 0)".to_string()),
        ..options(&cdn, "obsidian")
    };

    let out = Snipper::new(StubRenderer).render(&src, opts).await.expect("render failed");

    let img = image::open(&out).unwrap().to_rgba8();
    assert_eq!(*img.get_pixel(0, 0), Rgba([0, 255, 0, 255]));
    assert!(
        !was_requested("obsidian.min.css"),
        "stylesheet fetched despite override"
    );
}

#[tokio::test]
async fn test_served_stylesheet_is_requested_without_override() {
    let cdn = start_stylesheet_server();
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(&dir, "demo.js", "let x = 1");

    let opts = RenderOptions {
        output: Some(dir.path().join("plain.png").to_string_lossy().into_owned()),
        ..options(&cdn, "hybrid")
    };
    Snipper::new(StubRenderer).render(&src, opts).await.expect("render failed");
    assert!(was_requested("hybrid.min.css"));
}

#[tokio::test]
async fn test_explicit_output_path() {
    let cdn = start_stylesheet_server();
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(&dir, "demo.js", "let x = 1");
    let target = dir.path().join("shots").join("demo.png");
    std::fs::create_dir_all(target.parent().unwrap()).unwrap();

    let opts = RenderOptions {
        output: Some(target.to_string_lossy().into_owned()),
        ..options(&cdn, "hybrid")
    };
    let out = Snipper::new(StubRenderer).render(&src, opts).await.expect("render failed");

    assert_eq!(out, target);
    assert!(target.exists());
    assert!(!dir.path().join("demo.js.png").exists());
}

#[tokio::test]
async fn test_unreadable_input_writes_nothing() {
    let cdn = start_stylesheet_server();
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("missing.js");

    let err = Snipper::new(StubRenderer)
        .render(&src, options(&cdn, "hybrid"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InputReadError(_)), "unexpected error: {:?}", err);
    assert!(!dir.path().join("missing.js.png").exists());
}

#[tokio::test]
async fn test_malformed_javascript_is_format_error() {
    let cdn = start_stylesheet_server();
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(&dir, "broken.js", "function f() { return [1, 2; }");

    let err = Snipper::new(StubRenderer)
        .render(&src, options(&cdn, "hybrid"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::FormatError(_)), "unexpected error: {:?}", err);
    assert!(!dir.path().join("broken.js.png").exists());
}

#[tokio::test]
async fn test_options_file_round_trips_through_pipeline() {
    let cdn = start_stylesheet_server();
    let dir = tempfile::tempdir().unwrap();
    let src = write_source(&dir, "demo.js", "let x = 1");
    let opts_path = dir.path().join("opts.json");
    std::fs::write(
        &opts_path,
        format!(
            r#"{{"theme":"monokai","cdnBase":"{}","webshotCustomConfig":{{"windowSize":{{"width":400,"height":300}}}}}}"#,
            cdn
        ),
    )
    .unwrap();

    let opts = RenderOptions::from_json_file(&opts_path).unwrap();
    let out = Snipper::new(StubRenderer).render(&src, opts).await.expect("render failed");

    let img = image::open(&out).unwrap().to_rgba8();
    assert_eq!(*img.get_pixel(0, 0), Rgba([0x27, 0x28, 0x22, 255]));
}
