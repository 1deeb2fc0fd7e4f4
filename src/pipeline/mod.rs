//! Pipeline stages for slide-deck export.
//!
//! Each submodule owns exactly one step, so each can be tested on its own
//! and the browser can be swapped out without touching the file handling.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ workdir ──▶ merge
//! (path/URL) (Chromium)  (slide_NN.pdf) (lopdf)
//! ```
//!
//! 1. [`input`]  : canonicalise the user-supplied path or URL to a loadable deck
//! 2. [`render`] : load the deck, show each slide in turn and print it as
//!    one fixed-size page
//! 3. [`workdir`]: persist page artifacts under zero-padded names and remove
//!    them once the run is done
//! 4. [`merge`]  : copy the single page of each artifact, in slide order,
//!    into one document; runs in `spawn_blocking`

pub mod input;
pub mod merge;
pub mod render;
pub mod workdir;
