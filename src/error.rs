//! Error types for the deck2pdf library.
//!
//! Every failure is fatal. The export pipeline has no partial-success mode:
//! a run either writes a complete, page-count-correct PDF at the destination
//! or writes nothing there at all. [`ExportError`] is therefore the only
//! error type, and each variant carries enough structure (path, slide number,
//! detail) for the CLI to print an actionable message.
//!
//! Variants are grouped by the stage that raises them:
//!
//! | Stage | Variants |
//! |-------|----------|
//! | Input / asset loading | `DeckNotFound`, `PermissionDenied`, `InvalidInput`, `BrowserLaunchFailed`, `AssetLoadFailed`, `SlideDiscoveryFailed`, `EmptyDeck` |
//! | Navigation | `NavigationFailed` |
//! | Rendering | `RenderFailed` |
//! | Merge | `MergeFailed`, `PageCountMismatch` |
//! | File system | `WorkDirFailed`, `StaleArtifacts`, `ArtifactWriteFailed`, `OutputWriteFailed` |

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the deck2pdf library.
#[derive(Debug, Error)]
pub enum ExportError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Slide deck not found: '{path}'\nCheck the path exists and is readable.")]
    DeckNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a usable file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    // ── Asset loading ─────────────────────────────────────────────────────
    /// Chromium could not be started or connected to.
    #[error(
        "Failed to launch headless Chromium: {0}\n\n\
Install Chrome or Chromium, or point at an existing binary with --chrome <PATH>.\n\
Inside containers you may also need --no-sandbox.\n"
    )]
    BrowserLaunchFailed(String),

    /// The deck could not be loaded (navigation failed, resource unreachable).
    #[error("Failed to load slide deck '{url}': {detail}")]
    AssetLoadFailed { url: String, detail: String },

    /// The slide count query could not be evaluated in the loaded deck.
    #[error("Could not count slides matching '{selector}': {detail}")]
    SlideDiscoveryFailed { selector: String, detail: String },

    /// The deck loaded but no element matched the slide selector.
    #[error("Slide deck '{url}' contains no slides matching '{selector}'")]
    EmptyDeck { url: String, selector: String },

    // ── Navigation ────────────────────────────────────────────────────────
    /// The show-slide command failed or is not defined by the deck.
    #[error("Could not display slide {slide}: {detail}")]
    NavigationFailed { slide: usize, detail: String },

    // ── Rendering ─────────────────────────────────────────────────────────
    /// The browser failed to print the displayed slide.
    #[error("Rendering failed for slide {slide}: {detail}")]
    RenderFailed { slide: usize, detail: String },

    // ── Merge ─────────────────────────────────────────────────────────────
    /// A page artifact is unreadable, corrupt, or holds no page.
    #[error("Failed to merge page artifact '{path}': {detail}")]
    MergeFailed { path: PathBuf, detail: String },

    /// The merged document does not hold one page per slide.
    #[error("Merged document has {actual} pages but the deck has {expected} slides")]
    PageCountMismatch { expected: usize, actual: usize },

    // ── File-system errors ────────────────────────────────────────────────
    /// Creating, listing or removing the working directory failed.
    #[error("Working directory '{path}' error: {source}")]
    WorkDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The working directory holds artifacts from an earlier run.
    #[error(
        "Working directory '{path}' already contains {count} page artifacts from a previous run.\n\
Remove it or rerun with --on-stale clear."
    )]
    StaleArtifacts { path: PathBuf, count: usize },

    /// A per-slide page artifact could not be written.
    #[error("Failed to write page artifact '{path}': {source}")]
    ArtifactWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write the output PDF.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExportError {
    /// The 1-indexed slide the error is attributed to, if any.
    pub fn slide(&self) -> Option<usize> {
        match self {
            ExportError::NavigationFailed { slide, .. } | ExportError::RenderFailed { slide, .. } => {
                Some(*slide)
            }
            _ => None,
        }
    }
}
