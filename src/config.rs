//! Configuration types for slide-deck export.
//!
//! Every knob of the pipeline lives in [`ExportConfig`], built via its
//! [`ExportConfigBuilder`]. All parameters are fixed for the duration of a
//! run: one page size, one settle policy, one working directory.

use crate::error::ExportError;
use crate::progress::ProgressCallback;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// CSS pixels per inch. Chromium lays out at 96 px/in when printing.
pub const CSS_PX_PER_INCH: f64 = 96.0;

/// Largest page edge Chromium will print, in CSS pixels (200 in).
pub const MAX_PAGE_PX: u32 = 19_200;

/// Upper bound for either settle duration.
pub const MAX_SETTLE_MS: u64 = 60_000;

/// Default working directory name, created beside the output file.
pub const DEFAULT_WORK_DIR_NAME: &str = "temp_pdfs";

static JS_IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("valid regex"));

/// Configuration for a slide-deck export.
///
/// Built via [`ExportConfig::builder()`] or using [`ExportConfig::default()`].
///
/// # Example
/// ```rust
/// use deck2pdf::{ExportConfig, PageSize, SettleMode};
///
/// let config = ExportConfig::builder()
///     .page_size(PageSize::new(1280, 720))
///     .transition_settle_ms(1500)
///     .settle_mode(SettleMode::Fixed)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ExportConfig {
    /// Viewport and PDF page size. Default: 1920 × 1080.
    pub page_size: PageSize,

    /// Upper bound on the wait after the deck loads, in ms. Default: 2000.
    ///
    /// Fonts and images can still be arriving after the load event fires.
    /// Printing too early produces visually incomplete pages, not an error.
    pub load_settle_ms: u64,

    /// Upper bound on the wait after each slide change, in ms. Default: 3000.
    pub transition_settle_ms: u64,

    /// How the settle durations are spent. Default: [`SettleMode::Readiness`].
    pub settle_mode: SettleMode,

    /// CSS selector matching one element per slide. Default: `.slide`.
    pub slide_selector: String,

    /// Global function the deck exposes to show slide N. Default: `showSlide`.
    pub show_slide_fn: String,

    /// Global variable holding the current slide, assigned before the
    /// show-slide call. Default: `currentSlide`. `None` skips the assignment.
    pub current_slide_var: Option<String>,

    /// Working directory for page artifacts.
    /// If None, uses `temp_pdfs` beside the output file.
    pub work_dir: Option<PathBuf>,

    /// What to do when the working directory holds artifacts from an
    /// earlier run. Default: [`StalePolicy::Clear`].
    pub stale_policy: StalePolicy,

    /// Explicit Chrome/Chromium executable. If None, the browser library
    /// searches the usual install locations.
    pub chrome_executable: Option<PathBuf>,

    /// Launch Chromium with `--no-sandbox` (needed in most containers).
    pub no_sandbox: bool,

    /// Optional progress events for CLI bars or host applications.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            page_size: PageSize::default(),
            load_settle_ms: 2000,
            transition_settle_ms: 3000,
            settle_mode: SettleMode::default(),
            slide_selector: ".slide".to_string(),
            show_slide_fn: "showSlide".to_string(),
            current_slide_var: Some("currentSlide".to_string()),
            work_dir: None,
            stale_policy: StalePolicy::default(),
            chrome_executable: None,
            no_sandbox: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExportConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExportConfig")
            .field("page_size", &self.page_size)
            .field("load_settle_ms", &self.load_settle_ms)
            .field("transition_settle_ms", &self.transition_settle_ms)
            .field("settle_mode", &self.settle_mode)
            .field("slide_selector", &self.slide_selector)
            .field("show_slide_fn", &self.show_slide_fn)
            .field("current_slide_var", &self.current_slide_var)
            .field("work_dir", &self.work_dir)
            .field("stale_policy", &self.stale_policy)
            .field("chrome_executable", &self.chrome_executable)
            .field("no_sandbox", &self.no_sandbox)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ExportProgressCallback>"),
            )
            .finish()
    }
}

impl ExportConfig {
    /// Create a new builder for `ExportConfig`.
    pub fn builder() -> ExportConfigBuilder {
        ExportConfigBuilder {
            config: Self::default(),
        }
    }

    /// Resolve the working directory for a run writing to `output`.
    pub fn work_dir_for(&self, output: &Path) -> PathBuf {
        if let Some(ref dir) = self.work_dir {
            return dir.clone();
        }
        match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.join(DEFAULT_WORK_DIR_NAME),
            _ => PathBuf::from(DEFAULT_WORK_DIR_NAME),
        }
    }
}

/// Builder for [`ExportConfig`].
#[derive(Debug)]
pub struct ExportConfigBuilder {
    config: ExportConfig,
}

impl ExportConfigBuilder {
    pub fn page_size(mut self, size: PageSize) -> Self {
        self.config.page_size = size;
        self
    }

    pub fn load_settle_ms(mut self, ms: u64) -> Self {
        self.config.load_settle_ms = ms.min(MAX_SETTLE_MS);
        self
    }

    pub fn transition_settle_ms(mut self, ms: u64) -> Self {
        self.config.transition_settle_ms = ms.min(MAX_SETTLE_MS);
        self
    }

    pub fn settle_mode(mut self, mode: SettleMode) -> Self {
        self.config.settle_mode = mode;
        self
    }

    pub fn slide_selector(mut self, selector: impl Into<String>) -> Self {
        self.config.slide_selector = selector.into();
        self
    }

    pub fn show_slide_fn(mut self, name: impl Into<String>) -> Self {
        self.config.show_slide_fn = name.into();
        self
    }

    pub fn current_slide_var(mut self, name: Option<String>) -> Self {
        self.config.current_slide_var = name;
        self
    }

    pub fn work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.work_dir = Some(dir.into());
        self
    }

    pub fn stale_policy(mut self, policy: StalePolicy) -> Self {
        self.config.stale_policy = policy;
        self
    }

    pub fn chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.chrome_executable = Some(path.into());
        self
    }

    pub fn no_sandbox(mut self, v: bool) -> Self {
        self.config.no_sandbox = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// The navigation names are spliced into JavaScript, so they must be
    /// plain identifiers.
    pub fn build(self) -> Result<ExportConfig, ExportError> {
        let c = &self.config;
        let PageSize {
            width_px,
            height_px,
        } = c.page_size;
        if width_px == 0 || height_px == 0 || width_px > MAX_PAGE_PX || height_px > MAX_PAGE_PX {
            return Err(ExportError::InvalidConfig(format!(
                "Page size must be 1–{MAX_PAGE_PX} px per edge, got {width_px}×{height_px}"
            )));
        }
        if c.slide_selector.trim().is_empty() {
            return Err(ExportError::InvalidConfig(
                "Slide selector must not be empty".into(),
            ));
        }
        if !JS_IDENTIFIER.is_match(&c.show_slide_fn) {
            return Err(ExportError::InvalidConfig(format!(
                "Show-slide function '{}' is not a JavaScript identifier",
                c.show_slide_fn
            )));
        }
        if let Some(ref var) = c.current_slide_var {
            if !JS_IDENTIFIER.is_match(var) {
                return Err(ExportError::InvalidConfig(format!(
                    "Current-slide variable '{var}' is not a JavaScript identifier"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Value types ──────────────────────────────────────────────────────────

/// Fixed page geometry in CSS pixels, shared by the viewport and every
/// printed page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSize {
    pub width_px: u32,
    pub height_px: u32,
}

impl Default for PageSize {
    fn default() -> Self {
        Self::new(1920, 1080)
    }
}

impl PageSize {
    pub const fn new(width_px: u32, height_px: u32) -> Self {
        Self {
            width_px,
            height_px,
        }
    }

    /// Page width in inches, as the print API expects.
    pub fn width_in(&self) -> f64 {
        self.width_px as f64 / CSS_PX_PER_INCH
    }

    /// Page height in inches.
    pub fn height_in(&self) -> f64 {
        self.height_px as f64 / CSS_PX_PER_INCH
    }

    /// Page width in PDF points (1/72 in), as it appears in a `MediaBox`.
    pub fn width_pt(&self) -> f64 {
        self.width_in() * 72.0
    }

    /// Page height in PDF points.
    pub fn height_pt(&self) -> f64 {
        self.height_in() * 72.0
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{}", self.width_px, self.height_px)
    }
}

/// How the pipeline waits for asynchronous work inside the deck to finish.
///
/// Both modes are bounded by the configured settle duration; neither can
/// hang the run longer than that on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SettleMode {
    /// Sleep the full settle duration every time.
    Fixed,
    /// Wait on the browser's readiness signals (fonts, images, running
    /// animations), returning early once they resolve. (default)
    #[default]
    Readiness,
}

/// What to do with `slide_*.pdf` files left behind by an earlier run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StalePolicy {
    /// Delete leftover page artifacts before rendering. (default)
    #[default]
    Clear,
    /// Abort with [`ExportError::StaleArtifacts`].
    Fail,
}
