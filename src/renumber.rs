//! Slide renumbering: repair an HTML deck after a slide was inserted with a
//! placeholder marker.
//!
//! A new slide is written into the deck as `data-slide="x"` (and optionally
//! `<div class="slide-number">x</div>`). [`renumber_placeholder`] gives it
//! its real position, shifts every later slide up by one and rewrites the
//! visible `C / M` counters and the `const totalSlides = N;` constant.
//!
//! ## Pass order
//!
//! The attribute pass runs first because it decides the new total; the
//! counter and constant passes only consume it.

use crate::error::ExportError;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// The attribute value marking a freshly inserted slide.
pub const PLACEHOLDER: &str = "x";

static DATA_SLIDE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"data-slide="(\w+)""#).expect("valid regex"));

static COUNTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<div class="slide-number">([0-9]+) / ([0-9]+)</div>"#).expect("valid regex")
});

static PLACEHOLDER_COUNTER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"<div class="slide-number">x</div>"#).expect("valid regex"));

static TOTAL_CONST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"const totalSlides = [0-9]+;").expect("valid regex"));

/// What a renumbering pass changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenumberOutcome {
    /// 1-based position of the placeholder slide among all `data-slide`
    /// attributes.
    pub position: usize,
    /// Slide total after the insertion.
    pub total: usize,
    /// `data-slide` attributes rewritten (the placeholder included).
    pub attributes_updated: usize,
    /// `slide-number` counters rewritten.
    pub counters_updated: usize,
}

/// Renumber the deck in `html` around its placeholder slide.
///
/// Returns `None` when the deck has no `data-slide="x"` attribute. The first
/// placeholder decides which numbered slides shift; every placeholder takes
/// its own 1-based position.
pub fn renumber_placeholder(html: &str) -> Option<(String, RenumberOutcome)> {
    let values: Vec<&str> = DATA_SLIDE
        .captures_iter(html)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect();
    let position = values.iter().position(|v| *v == PLACEHOLDER)? + 1;
    debug!("Placeholder slide at position {} of {}", position, values.len());

    let (html, total, attributes_updated) = renumber_attributes(html, position, values.len());
    let (html, counters_updated) = renumber_counters(&html, position, total);
    let html = TOTAL_CONST
        .replace_all(&html, format!("const totalSlides = {total};").as_str())
        .into_owned();

    Some((
        html,
        RenumberOutcome {
            position,
            total,
            attributes_updated,
            counters_updated,
        },
    ))
}

/// Renumber the deck file at `path` in place.
///
/// The file is left untouched (and `Ok(None)` returned) when it holds no
/// placeholder slide.
pub async fn renumber_file(path: &Path) -> Result<Option<RenumberOutcome>, ExportError> {
    let html = match tokio::fs::read_to_string(path).await {
        Ok(html) => html,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ExportError::DeckNotFound {
                path: path.to_path_buf(),
            });
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ExportError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(e) => {
            return Err(ExportError::InvalidInput {
                input: format!("{}: {e}", path.display()),
            });
        }
    };

    let Some((updated, outcome)) = renumber_placeholder(&html) else {
        info!("No placeholder slide in {}; nothing to renumber", path.display());
        return Ok(None);
    };

    tokio::fs::write(path, updated)
        .await
        .map_err(|source| ExportError::OutputWriteFailed {
            path: path.to_path_buf(),
            source,
        })?;
    info!(
        "Renumbered {}: placeholder is slide {} of {}",
        path.display(),
        outcome.position,
        outcome.total
    );
    Ok(Some(outcome))
}

// ── Pass 1: data-slide attributes ────────────────────────────────────────

/// Returns the rewritten text, the new total and the number of attributes
/// changed.
fn renumber_attributes(html: &str, position: usize, found: usize) -> (String, usize, usize) {
    let mut total = found;
    let mut index = 0;
    let mut updated = 0;

    let out = DATA_SLIDE.replace_all(html, |caps: &Captures| {
        index += 1;
        let value = &caps[1];
        let renumbered = if value == PLACEHOLDER {
            Some(index)
        } else if value.bytes().all(|b| b.is_ascii_digit()) {
            match value.parse::<usize>() {
                Ok(n) if n >= position => {
                    total = total.max(n + 1);
                    Some(n + 1)
                }
                _ => None,
            }
        } else {
            None
        };
        match renumbered {
            Some(n) => {
                updated += 1;
                format!("data-slide=\"{n}\"")
            }
            None => caps[0].to_string(),
        }
    });
    (out.into_owned(), total, updated)
}

// ── Pass 2: visible counters ─────────────────────────────────────────────

fn renumber_counters(html: &str, position: usize, total: usize) -> (String, usize) {
    let mut updated = 0;

    let out = COUNTER.replace_all(html, |caps: &Captures| {
        updated += 1;
        let current = caps[1]
            .parse::<usize>()
            .map(|c| if c >= position { c + 1 } else { c });
        match current {
            Ok(c) => format!(r#"<div class="slide-number">{c} / {total}</div>"#),
            Err(_) => caps[0].to_string(),
        }
    });

    let replacement = format!(r#"<div class="slide-number">{position} / {total}</div>"#);
    let out = PLACEHOLDER_COUNTER.replace_all(&out, |_: &Captures| {
        updated += 1;
        replacement.clone()
    });
    (out.into_owned(), updated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slide(value: &str, counter: &str) -> String {
        format!(
            "<section class=\"slide\" data-slide=\"{value}\">\n  <div class=\"slide-number\">{counter}</div>\n</section>\n"
        )
    }

    fn deck(slides: &[(&str, &str)], total_const: usize) -> String {
        let body: String = slides.iter().map(|(v, c)| slide(v, c)).collect();
        format!("<html><body>\n{body}<script>const totalSlides = {total_const};</script></body></html>")
    }

    #[test]
    fn inserts_placeholder_in_the_middle() {
        let html = deck(
            &[("1", "1 / 4"), ("2", "2 / 4"), ("x", "x"), ("3", "3 / 4"), ("4", "4 / 4")],
            4,
        );
        let (out, outcome) = renumber_placeholder(&html).unwrap();

        assert_eq!(outcome.position, 3);
        assert_eq!(outcome.total, 5);
        assert_eq!(outcome.attributes_updated, 3);
        assert_eq!(outcome.counters_updated, 5);

        let expected = deck(
            &[("1", "1 / 5"), ("2", "2 / 5"), ("3", "3 / 5"), ("4", "4 / 5"), ("5", "5 / 5")],
            5,
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn placeholder_at_the_end() {
        let html = deck(&[("1", "1 / 2"), ("2", "2 / 2"), ("x", "x")], 2);
        let (out, outcome) = renumber_placeholder(&html).unwrap();
        assert_eq!(outcome.position, 3);
        assert_eq!(outcome.total, 3);
        assert!(out.contains(r#"data-slide="3""#));
        assert!(out.contains(r#"<div class="slide-number">3 / 3</div>"#));
        assert!(out.contains(r#"<div class="slide-number">1 / 3</div>"#));
        assert!(out.contains("const totalSlides = 3;"));
    }

    #[test]
    fn placeholder_first() {
        let html = deck(&[("x", "x"), ("1", "1 / 1")], 1);
        let (out, outcome) = renumber_placeholder(&html).unwrap();
        assert_eq!(outcome.position, 1);
        assert_eq!(outcome.total, 2);
        assert_eq!(out, deck(&[("1", "1 / 2"), ("2", "2 / 2")], 2));
    }

    #[test]
    fn no_placeholder_means_nothing_to_do() {
        let html = deck(&[("1", "1 / 2"), ("2", "2 / 2")], 2);
        assert!(renumber_placeholder(&html).is_none());
        assert!(renumber_placeholder("").is_none());
    }

    #[test]
    fn named_slides_count_toward_position_but_keep_their_names() {
        let html = deck(&[("intro", "1 / 3"), ("x", "x"), ("2", "2 / 3"), ("3", "3 / 3")], 3);
        let (out, outcome) = renumber_placeholder(&html).unwrap();
        assert_eq!(outcome.position, 2);
        assert!(out.contains(r#"data-slide="intro""#));
        assert!(out.contains(r#"data-slide="2""#));
        assert!(out.contains(r#"data-slide="3""#));
        assert!(out.contains(r#"data-slide="4""#));
        assert_eq!(outcome.total, 4);
    }

    #[test]
    fn total_never_shrinks_below_highest_number() {
        // Sparse numbering: the highest shifted number wins over the count.
        let html = deck(&[("1", "1 / 9"), ("x", "x"), ("9", "9 / 9")], 9);
        let (out, outcome) = renumber_placeholder(&html).unwrap();
        assert_eq!(outcome.total, 10);
        assert!(out.contains(r#"<div class="slide-number">10 / 10</div>"#));
        assert!(out.contains("const totalSlides = 10;"));
    }

    #[test]
    fn every_placeholder_takes_its_own_position() {
        let html = deck(&[("1", "1 / 2"), ("x", "x"), ("2", "2 / 2"), ("x", "x")], 2);
        let (out, outcome) = renumber_placeholder(&html).unwrap();

        assert_eq!(outcome.position, 2);
        assert_eq!(outcome.total, 4);
        assert_eq!(outcome.attributes_updated, 3);
        assert!(!out.contains(r#"data-slide="x""#), "got {out}");
        for n in 1..=4 {
            assert!(out.contains(&format!(r#"data-slide="{n}""#)), "missing {n} in {out}");
        }
        assert!(out.contains("const totalSlides = 4;"));
    }

    #[tokio::test]
    async fn file_is_rewritten_in_place() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.html");
        std::fs::write(&path, deck(&[("1", "1 / 1"), ("x", "x")], 1)).unwrap();

        let outcome = renumber_file(&path).await.unwrap().unwrap();
        assert_eq!(outcome.total, 2);
        let html = std::fs::read_to_string(&path).unwrap();
        assert!(html.contains(r#"<div class="slide-number">2 / 2</div>"#));
        assert!(!html.contains(r#"data-slide="x""#));
    }

    #[tokio::test]
    async fn file_without_placeholder_is_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.html");
        let original = deck(&[("1", "1 / 1")], 1);
        std::fs::write(&path, &original).unwrap();

        assert!(renumber_file(&path).await.unwrap().is_none());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), original);
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = renumber_file(&dir.path().join("nope.html"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::DeckNotFound { .. }));
    }
}
