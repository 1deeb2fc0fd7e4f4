//! End-to-end tests for deck2pdf against a real headless Chromium.
//!
//! These tests write small HTML decks to a temporary directory and export
//! them through the browser. They are gated behind the `E2E_ENABLED`
//! environment variable so they do not run in CI unless explicitly
//! requested.
//!
//! Run with:
//!   E2E_ENABLED=1 cargo test --test e2e -- --nocapture
//!
//! Set `CHROME` to point at a specific browser binary, and `E2E_NO_SANDBOX=1`
//! inside containers.

use deck2pdf::pipeline::merge::page_sizes;
use deck2pdf::{export, inspect, ExportConfig, ExportError, PageSize, SettleMode};
use lopdf::Document;
use std::path::{Path, PathBuf};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Skip this test if E2E_ENABLED is not set.
macro_rules! e2e_skip_unless_ready {
    () => {{
        if std::env::var("E2E_ENABLED").is_err() {
            println!("SKIP: set E2E_ENABLED=1 to run e2e tests");
            return;
        }
    }};
}

/// A deck of `slides` full-viewport sections with a fade transition.
fn deck_html(slides: usize) -> String {
    let sections: String = (1..=slides)
        .map(|i| {
            format!(
                "<section class=\"slide\"><h1>Slide {i}</h1>\
                 <div class=\"slide-number\">{i} / {slides}</div></section>\n"
            )
        })
        .collect();
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<title>E2E deck</title>
<style>
  html, body {{ margin: 0; width: 100%; height: 100%; overflow: hidden; }}
  .slide {{ position: absolute; inset: 0; opacity: 0; transition: opacity 0.3s; background: #123; color: #fff; }}
  .slide.active {{ opacity: 1; }}
</style>
</head>
<body>
{sections}<script>
  const totalSlides = {slides};
  let currentSlide = 1;
  function showSlide(n) {{
    document.querySelectorAll('.slide').forEach((el, i) => el.classList.toggle('active', i + 1 === n));
  }}
  showSlide(currentSlide);
</script>
</body>
</html>
"#
    )
}

fn write_deck(dir: &Path, name: &str, html: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, html).unwrap();
    path
}

fn config(work_dir: &Path) -> ExportConfig {
    let mut builder = ExportConfig::builder()
        .load_settle_ms(1000)
        .transition_settle_ms(1000)
        .work_dir(work_dir)
        .no_sandbox(std::env::var("E2E_NO_SANDBOX").is_ok());
    if let Ok(chrome) = std::env::var("CHROME") {
        builder = builder.chrome_executable(chrome);
    }
    builder.build().unwrap()
}

// ── Export ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_export_three_slide_deck() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let input = write_deck(dir.path(), "deck.html", &deck_html(3));
    let output = dir.path().join("deck.pdf");
    let work_dir = dir.path().join("temp_pdfs");

    let stats = export(input.to_str().unwrap(), &output, &config(&work_dir))
        .await
        .expect("export() should succeed");

    assert_eq!(stats.slide_count, 3);
    assert_eq!(stats.page_count, 3);
    assert!(!work_dir.exists(), "working directory should be removed");

    let doc = Document::load(&output).unwrap();
    assert_eq!(doc.get_pages().len(), 3);
    for size in page_sizes(&doc) {
        let (w, h) = size.expect("every page has a MediaBox");
        assert!((w - 1440.0).abs() < 1.0, "width {w}");
        assert!((h - 810.0).abs() < 1.0, "height {h}");
    }
    println!("Stats: {:?}", stats);
}

#[tokio::test]
async fn test_export_custom_page_size_fixed_settle() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let input = write_deck(dir.path(), "deck.html", &deck_html(2));
    let output = dir.path().join("deck.pdf");

    let mut config = config(&dir.path().join("work"));
    config.page_size = PageSize::new(1280, 720);
    config.settle_mode = SettleMode::Fixed;
    config.transition_settle_ms = 400;

    export(input.to_str().unwrap(), &output, &config)
        .await
        .expect("export() should succeed");

    let doc = Document::load(&output).unwrap();
    let sizes = page_sizes(&doc);
    assert_eq!(sizes.len(), 2);
    let (w, h) = sizes[0].unwrap();
    assert!((w - 960.0).abs() < 1.0, "width {w}");
    assert!((h - 540.0).abs() < 1.0, "height {h}");
}

#[tokio::test]
async fn test_export_deck_without_slides() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let input = write_deck(
        dir.path(),
        "empty.html",
        "<html><body><p>No slides</p><script>function showSlide(n) {}</script></body></html>",
    );
    let output = dir.path().join("empty.pdf");

    let err = export(input.to_str().unwrap(), &output, &config(&dir.path().join("work")))
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::EmptyDeck { .. }), "got {err}");
    assert!(!output.exists());
}

#[tokio::test]
async fn test_export_deck_without_show_function() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let input = write_deck(
        dir.path(),
        "static.html",
        "<html><body><section class=\"slide\">Only</section></body></html>",
    );
    let output = dir.path().join("static.pdf");

    let err = export(input.to_str().unwrap(), &output, &config(&dir.path().join("work")))
        .await
        .unwrap_err();

    assert!(
        matches!(err, ExportError::NavigationFailed { slide: 1, .. }),
        "got {err}"
    );
    assert!(!output.exists());
}

// ── Inspect ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_inspect_counts_slides() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let input = write_deck(dir.path(), "deck.html", &deck_html(5));

    let info = inspect(input.to_str().unwrap(), &config(&dir.path().join("work")))
        .await
        .expect("inspect() should succeed");

    assert_eq!(info.slide_count, 5);
    assert_eq!(info.title.as_deref(), Some("E2E deck"));
    assert!(info.source.starts_with("file://"));
}

#[tokio::test]
async fn test_missing_deck_fails_before_launch() {
    e2e_skip_unless_ready!();
    let dir = tempfile::tempdir().unwrap();
    let err = export(
        dir.path().join("nope.html").to_str().unwrap(),
        dir.path().join("nope.pdf"),
        &config(&dir.path().join("work")),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ExportError::DeckNotFound { .. }));
}
