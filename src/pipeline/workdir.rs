//! The working area: a transient directory of per-slide page artifacts.
//!
//! Artifacts are named `slide_NN.pdf` with a zero-padded index whose width
//! is fixed for the run (`max(2, digits(total))`), so a directory listing
//! sorts in slide order. One run owns the directory exclusively; there is no
//! locking against a concurrent run using the same path.
//!
//! The area only ever deletes files that look like page artifacts. Anything
//! else a user left in the directory survives, and makes the final
//! directory removal fail loudly rather than silently discarding it.

use crate::config::StalePolicy;
use crate::error::ExportError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

static ARTIFACT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^slide_\d+\.pdf$").expect("valid regex"));

/// Index width for a run of `total` slides.
pub fn pad_width(total: usize) -> usize {
    total.to_string().len().max(2)
}

/// File name of the artifact for 1-indexed `slide`.
pub fn artifact_name(slide: usize, width: usize) -> String {
    format!("slide_{slide:0width$}.pdf")
}

/// Whether `name` is a page artifact file name (from this or any run).
pub fn is_artifact_name(name: &str) -> bool {
    ARTIFACT_NAME.is_match(name)
}

/// A prepared working directory for one export run.
#[derive(Debug)]
pub struct WorkArea {
    dir: PathBuf,
    width: usize,
    artifacts: Vec<PathBuf>,
}

impl WorkArea {
    /// Create `dir` if needed and apply `policy` to leftover artifacts.
    pub async fn prepare(
        dir: &Path,
        total_slides: usize,
        policy: StalePolicy,
    ) -> Result<Self, ExportError> {
        let io_err = |source| ExportError::WorkDirFailed {
            path: dir.to_path_buf(),
            source,
        };

        tokio::fs::create_dir_all(dir).await.map_err(io_err)?;

        let stale = list_artifacts(dir).await?;
        if !stale.is_empty() {
            match policy {
                StalePolicy::Fail => {
                    return Err(ExportError::StaleArtifacts {
                        path: dir.to_path_buf(),
                        count: stale.len(),
                    });
                }
                StalePolicy::Clear => {
                    warn!(
                        "Removing {} stale page artifacts from {}",
                        stale.len(),
                        dir.display()
                    );
                    for path in &stale {
                        tokio::fs::remove_file(path).await.map_err(io_err)?;
                    }
                }
            }
        }

        debug!("Working area ready: {}", dir.display());
        Ok(Self {
            dir: dir.to_path_buf(),
            width: pad_width(total_slides),
            artifacts: Vec::with_capacity(total_slides),
        })
    }

    /// Path of the artifact for 1-indexed `slide`.
    pub fn artifact_path(&self, slide: usize) -> PathBuf {
        self.dir.join(artifact_name(slide, self.width))
    }

    /// Persist the page for the next slide. Slides must arrive in order.
    pub async fn write_artifact(&mut self, slide: usize, pdf: &[u8]) -> Result<&Path, ExportError> {
        let expected = self.artifacts.len() + 1;
        if slide != expected {
            return Err(ExportError::Internal(format!(
                "page artifact for slide {slide} written out of order (expected slide {expected})"
            )));
        }

        let path = self.artifact_path(slide);
        tokio::fs::write(&path, pdf)
            .await
            .map_err(|source| ExportError::ArtifactWriteFailed {
                path: path.clone(),
                source,
            })?;
        debug!("Wrote {} ({} bytes)", path.display(), pdf.len());

        self.artifacts.push(path);
        Ok(self.artifacts[slide - 1].as_path())
    }

    /// Artifacts written so far, in slide order.
    pub fn artifacts(&self) -> &[PathBuf] {
        &self.artifacts
    }

    /// Delete every artifact of this run, then the now-empty directory.
    pub async fn cleanup(self) -> Result<(), ExportError> {
        for path in &self.artifacts {
            tokio::fs::remove_file(path)
                .await
                .map_err(|source| ExportError::WorkDirFailed {
                    path: path.clone(),
                    source,
                })?;
        }
        tokio::fs::remove_dir(&self.dir)
            .await
            .map_err(|source| ExportError::WorkDirFailed {
                path: self.dir.clone(),
                source,
            })?;
        info!(
            "Removed {} page artifacts and {}",
            self.artifacts.len(),
            self.dir.display()
        );
        Ok(())
    }
}

/// Page artifacts currently present in `dir`, sorted by name.
async fn list_artifacts(dir: &Path) -> Result<Vec<PathBuf>, ExportError> {
    let io_err = |source| ExportError::WorkDirFailed {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = tokio::fs::read_dir(dir).await.map_err(io_err)?;
    let mut found = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let name = entry.file_name();
        if name.to_str().is_some_and(is_artifact_name) && entry.path().is_file() {
            found.push(entry.path());
        }
    }
    found.sort();
    Ok(found)
}
