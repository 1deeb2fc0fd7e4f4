//! # deck2pdf
//!
//! Export HTML slide decks to PDF, one page per slide, by driving the deck
//! in headless Chromium.
//!
//! A slide deck written as a single HTML page shows one slide at a time and
//! switches slides from JavaScript, so printing the page as a whole yields
//! either one slide or a pile of overlapping ones. This crate instead shows
//! each slide in turn, waits for its transition to settle, prints it as one
//! fixed-size page and stitches the pages together.
//!
//! ## Pipeline Overview
//!
//! ```text
//! HTML deck
//!  │
//!  ├─ 1. Input    resolve local file or pass through an HTTP(S) URL
//!  ├─ 2. Open     load into Chromium, viewport == page size, settle
//!  ├─ 3. Count    document.querySelectorAll(".slide").length
//!  ├─ 4. Render   per slide: showSlide(n) → settle → print → slide_NN.pdf
//!  ├─ 5. Merge    copy each artifact's page into one document (lopdf)
//!  └─ 6. Output   atomic write, then remove temp_pdfs/
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use deck2pdf::{export, ExportConfig, PageSize};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExportConfig::builder()
//!         .page_size(PageSize::new(1920, 1080))
//!         .no_sandbox(true)
//!         .build()?;
//!     let stats = export("presentation.html", "presentation.pdf", &config).await?;
//!     eprintln!("{} slides in {}ms", stats.slide_count, stats.total_duration_ms);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `deck2pdf` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! deck2pdf = { version = "0.1", default-features = false }
//! ```
//!
//! ## Deck Requirements
//!
//! | Need | Default | Override |
//! |------|---------|----------|
//! | One element per slide | `.slide` | [`ExportConfigBuilder::slide_selector`] |
//! | Global function showing slide N | `showSlide` | [`ExportConfigBuilder::show_slide_fn`] |
//! | Global current-slide variable | `currentSlide` | [`ExportConfigBuilder::current_slide_var`] |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod export;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod renumber;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ExportConfig, ExportConfigBuilder, PageSize, SettleMode, StalePolicy};
pub use error::ExportError;
pub use export::{export, export_sync, export_with, inspect, inspect_with};
pub use output::{DeckInfo, ExportStats};
pub use pipeline::input::{resolve_deck, DeckSource};
pub use pipeline::render::{ChromeRenderer, SlideRenderer};
pub use progress::{ExportProgressCallback, NoopProgressCallback, ProgressCallback};
pub use renumber::{renumber_file, renumber_placeholder, RenumberOutcome};
