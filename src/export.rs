//! Export entry points: drive a deck through render → merge → cleanup.
//!
//! The pipeline is strictly linear. Every slide is displayed, settled,
//! printed and persisted before the next one begins, and any failure aborts
//! the whole run. The merged PDF reaches the destination through a temporary
//! file in the same directory followed by a rename, so a failed run never
//! leaves a truncated or partial document behind.

use crate::config::ExportConfig;
use crate::error::ExportError;
use crate::output::{DeckInfo, ExportStats};
use crate::pipeline::input::{self, DeckSource};
use crate::pipeline::merge;
use crate::pipeline::render::{ChromeRenderer, SlideRenderer};
use crate::pipeline::workdir::WorkArea;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Export an HTML slide deck to a PDF with one page per slide.
///
/// This is the primary entry point for the library. It launches headless
/// Chromium, runs [`export_with`] against it and always shuts the browser
/// down afterwards.
///
/// # Arguments
/// * `input_str`:   local file path or HTTP/HTTPS URL of the deck
/// * `output_path`: destination PDF, overwritten if present
/// * `config`:      export configuration
///
/// # Errors
/// Every failure is fatal and leaves the destination untouched:
/// - Deck not found / browser cannot start / deck fails to load
/// - No slides match the selector
/// - A slide fails to display or print
/// - An artifact cannot be merged, or the output cannot be written
///
/// # Example
/// ```rust,no_run
/// use deck2pdf::{export, ExportConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ExportConfig::default();
/// let stats = export("talk.html", "talk.pdf", &config).await?;
/// println!("{} pages", stats.page_count);
/// # Ok(())
/// # }
/// ```
pub async fn export(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ExportConfig,
) -> Result<ExportStats, ExportError> {
    let input_str = input_str.as_ref();
    info!("Starting export: {}", input_str);

    let deck = input::resolve_deck(input_str)?;
    let mut renderer = ChromeRenderer::launch(config).await?;

    let result = export_with(&mut renderer, &deck, output_path.as_ref(), config).await;

    if let Err(e) = renderer.close().await {
        warn!("{}", e);
    }
    result
}

/// Run the export pipeline against any [`SlideRenderer`].
///
/// The renderer is opened on `deck` but not closed; that stays with the
/// caller who created it.
pub async fn export_with<R: SlideRenderer>(
    renderer: &mut R,
    deck: &DeckSource,
    output: &Path,
    config: &ExportConfig,
) -> Result<ExportStats, ExportError> {
    let total_start = Instant::now();

    // ── Step 1: Load the deck ────────────────────────────────────────────
    renderer.open(deck).await?;

    // ── Step 2: Discover slides ──────────────────────────────────────────
    let total = renderer.slide_count().await?;
    if total == 0 {
        return Err(ExportError::EmptyDeck {
            url: deck.url().to_string(),
            selector: config.slide_selector.clone(),
        });
    }
    info!("Deck has {} slides", total);

    if let Some(ref cb) = config.progress_callback {
        cb.on_export_start(total);
    }

    // ── Step 3: Prepare the working area ─────────────────────────────────
    let work_dir = config.work_dir_for(output);
    let mut area = WorkArea::prepare(&work_dir, total, config.stale_policy).await?;

    // ── Step 4: Display and print every slide, in order ──────────────────
    let render_start = Instant::now();
    for slide in 1..=total {
        if let Some(ref cb) = config.progress_callback {
            cb.on_slide_start(slide, total);
        }

        renderer.display_slide(slide).await?;
        let pdf = renderer.render_page(slide).await?;
        let path = area.write_artifact(slide, &pdf).await?;
        debug!("Slide {}/{} → {}", slide, total, path.display());

        if let Some(ref cb) = config.progress_callback {
            cb.on_slide_rendered(slide, total, pdf.len());
        }
    }
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!("Rendered {} slides in {}ms", total, render_duration_ms);

    // ── Step 5: Merge artifacts ──────────────────────────────────────────
    if let Some(ref cb) = config.progress_callback {
        cb.on_merge_start(total);
    }
    let merge_start = Instant::now();
    let merged = merge::merge_to_bytes(area.artifacts().to_vec()).await?;
    if merged.page_count != total {
        return Err(ExportError::PageCountMismatch {
            expected: total,
            actual: merged.page_count,
        });
    }

    // ── Step 6: Write the output atomically ──────────────────────────────
    let output_bytes = merged.bytes.len() as u64;
    write_atomic(output, merged.bytes).await?;
    let merge_duration_ms = merge_start.elapsed().as_millis() as u64;
    info!("Wrote {} ({} bytes)", output.display(), output_bytes);

    // ── Step 7: Remove artifacts and the working directory ───────────────
    area.cleanup().await?;

    let stats = ExportStats {
        slide_count: total,
        page_count: merged.page_count,
        output_path: output.to_path_buf(),
        output_bytes,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        render_duration_ms,
        merge_duration_ms,
    };

    info!(
        "Export complete: {} pages, {}ms total",
        stats.page_count, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_export_complete(&stats);
    }

    Ok(stats)
}

/// Synchronous wrapper around [`export`].
///
/// Creates a temporary tokio runtime internally.
pub fn export_sync(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ExportConfig,
) -> Result<ExportStats, ExportError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ExportError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(export(input_str, output_path, config))
}

/// Load a deck and count its slides without rendering anything.
///
/// Nothing is written to disk.
pub async fn inspect(
    input_str: impl AsRef<str>,
    config: &ExportConfig,
) -> Result<DeckInfo, ExportError> {
    let deck = input::resolve_deck(input_str.as_ref())?;
    let mut renderer = ChromeRenderer::launch(config).await?;

    let result = inspect_with(&mut renderer, &deck).await;

    if let Err(e) = renderer.close().await {
        warn!("{}", e);
    }
    result
}

/// [`inspect`] against any [`SlideRenderer`].
pub async fn inspect_with<R: SlideRenderer>(
    renderer: &mut R,
    deck: &DeckSource,
) -> Result<DeckInfo, ExportError> {
    renderer.open(deck).await?;
    let slide_count = renderer.slide_count().await?;
    let title = renderer.title().await?;
    Ok(DeckInfo {
        source: deck.url().to_string(),
        slide_count,
        title,
    })
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Write `bytes` to a temporary file beside `path`, then rename it over
/// `path`. The temporary file is removed if anything fails before the rename.
async fn write_atomic(path: &Path, bytes: Vec<u8>) -> Result<(), ExportError> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let write_err = |source| ExportError::OutputWriteFailed {
            path: path.clone(),
            source,
        };

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(write_err)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".deck2pdf-")
            .suffix(".pdf.tmp")
            .tempfile_in(&parent)
            .map_err(write_err)?;
        tmp.write_all(&bytes).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(&path).map_err(|e| write_err(e.error))?;
        Ok(())
    })
    .await
    .map_err(|e| ExportError::Internal(format!("Output write task panicked: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn atomic_write_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.pdf");
        std::fs::write(&path, b"old contents").unwrap();

        write_atomic(&path, b"%PDF-1.7 new".to_vec()).await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7 new");
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "deck.pdf")
            .collect();
        assert!(leftovers.is_empty(), "temporary file left behind");
    }

    #[tokio::test]
    async fn atomic_write_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("nested").join("deck.pdf");
        write_atomic(&path, b"%PDF".to_vec()).await.unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn export_sync_reports_missing_deck() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("talk.pdf");
        let err = export_sync(
            dir.path().join("missing.html").to_str().unwrap(),
            &output,
            &ExportConfig::default(),
        )
        .unwrap_err();

        assert!(matches!(err, ExportError::DeckNotFound { .. }), "got {err}");
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn atomic_write_into_a_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();

        let err = write_atomic(&blocker.join("deck.pdf"), b"%PDF".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::OutputWriteFailed { .. }));
    }
}
