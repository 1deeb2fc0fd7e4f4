//! Progress-callback trait for per-slide export events.
//!
//! Inject an [`Arc<dyn ExportProgressCallback>`] via
//! [`crate::config::ExportConfigBuilder::progress_callback`] to receive
//! events as the pipeline renders each slide and merges the result.
//!
//! The pipeline is strictly sequential, so events for one run always arrive
//! in order: `on_export_start`, then `on_slide_start`/`on_slide_rendered`
//! for slide 1, 2, …, then `on_merge_start`, then `on_export_complete`.
//!
//! # Example
//!
//! ```rust
//! use deck2pdf::{ExportConfig, ExportProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     rendered: AtomicUsize,
//! }
//!
//! impl ExportProgressCallback for CountingCallback {
//!     fn on_slide_rendered(&self, slide: usize, total: usize, pdf_bytes: usize) {
//!         self.rendered.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("Slide {}/{} printed ({} bytes)", slide, total, pdf_bytes);
//!     }
//! }
//!
//! let counter = Arc::new(CountingCallback { rendered: AtomicUsize::new(0) });
//!
//! let config = ExportConfig::builder()
//!     .progress_callback(counter as Arc<dyn ExportProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::ExportStats;
use std::sync::Arc;

/// Called by the export pipeline as it works through the deck.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait ExportProgressCallback: Send + Sync {
    /// Called once the slide count is known, before any slide is rendered.
    fn on_export_start(&self, total_slides: usize) {
        let _ = total_slides;
    }

    /// Called just before slide `slide` (1-indexed) is displayed.
    fn on_slide_start(&self, slide: usize, total_slides: usize) {
        let _ = (slide, total_slides);
    }

    /// Called when the page artifact for a slide has been written.
    ///
    /// # Arguments
    /// * `slide`       : 1-indexed slide number
    /// * `total_slides`: total slides in the deck
    /// * `pdf_bytes`   : size of the single-page PDF artifact
    fn on_slide_rendered(&self, slide: usize, total_slides: usize, pdf_bytes: usize) {
        let _ = (slide, total_slides, pdf_bytes);
    }

    /// Called once after every slide is rendered, before merging.
    fn on_merge_start(&self, total_slides: usize) {
        let _ = total_slides;
    }

    /// Called once the output has been written and the working area removed.
    fn on_export_complete(&self, stats: &ExportStats) {
        let _ = stats;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl ExportProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ExportConfig`].
pub type ProgressCallback = Arc<dyn ExportProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        started_total: AtomicUsize,
        starts: AtomicUsize,
        rendered: AtomicUsize,
        rendered_bytes: AtomicUsize,
        merges: AtomicUsize,
        completed_pages: AtomicUsize,
    }

    impl ExportProgressCallback for TrackingCallback {
        fn on_export_start(&self, total_slides: usize) {
            self.started_total.store(total_slides, Ordering::SeqCst);
        }

        fn on_slide_start(&self, _slide: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_slide_rendered(&self, _slide: usize, _total: usize, pdf_bytes: usize) {
            self.rendered.fetch_add(1, Ordering::SeqCst);
            self.rendered_bytes.fetch_add(pdf_bytes, Ordering::SeqCst);
        }

        fn on_merge_start(&self, _total: usize) {
            self.merges.fetch_add(1, Ordering::SeqCst);
        }

        fn on_export_complete(&self, stats: &ExportStats) {
            self.completed_pages.store(stats.page_count, Ordering::SeqCst);
        }
    }

    fn stats(pages: usize) -> ExportStats {
        ExportStats {
            slide_count: pages,
            page_count: pages,
            output_path: PathBuf::from("deck.pdf"),
            output_bytes: 1024,
            total_duration_ms: 10,
            render_duration_ms: 8,
            merge_duration_ms: 2,
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_export_start(5);
        cb.on_slide_start(1, 5);
        cb.on_slide_rendered(1, 5, 42);
        cb.on_merge_start(5);
        cb.on_export_complete(&stats(5));
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_export_start(3);
        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 3);

        for slide in 1..=3 {
            tracker.on_slide_start(slide, 3);
            tracker.on_slide_rendered(slide, 3, 100);
        }
        tracker.on_merge_start(3);
        tracker.on_export_complete(&stats(3));

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.rendered.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.rendered_bytes.load(Ordering::SeqCst), 300);
        assert_eq!(tracker.merges.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.completed_pages.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_export_start(10);
        cb.on_slide_start(1, 10);
        cb.on_slide_rendered(1, 10, 512);
    }
}
