//! Result types returned by the export and inspect entry points.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Summary of a completed export run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportStats {
    /// Slides discovered in the deck.
    pub slide_count: usize,
    /// Pages in the written PDF. Always equal to `slide_count`.
    pub page_count: usize,
    /// Where the merged PDF was written.
    pub output_path: PathBuf,
    /// Size of the merged PDF on disk.
    pub output_bytes: u64,
    pub total_duration_ms: u64,
    /// Time spent navigating, settling and printing slides.
    pub render_duration_ms: u64,
    /// Time spent merging artifacts and writing the output.
    pub merge_duration_ms: u64,
}

/// What [`crate::inspect`] learns about a deck without rendering it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckInfo {
    /// URL the browser loaded.
    pub source: String,
    pub slide_count: usize,
    /// `document.title`, if non-empty.
    pub title: Option<String>,
}
