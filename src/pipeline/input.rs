//! Input resolution: normalise a user-supplied path or URL to something the
//! browser can navigate to.
//!
//! Local decks are validated up front (exists, readable) so a typo surfaces
//! as [`ExportError::DeckNotFound`] instead of a blank page printed from a
//! browser error screen. HTTP(S) URLs are passed through unchanged; the
//! browser fetches them itself.

use crate::error::ExportError;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A slide-show document the browser can load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeckSource {
    /// A deck on the local file system, canonicalised.
    Local { path: PathBuf, url: String },
    /// A deck served over HTTP(S).
    Remote(String),
}

impl DeckSource {
    /// The URL handed to the browser.
    pub fn url(&self) -> &str {
        match self {
            DeckSource::Local { url, .. } => url,
            DeckSource::Remote(url) => url,
        }
    }

    /// The local path, if the deck is a file.
    pub fn path(&self) -> Option<&Path> {
        match self {
            DeckSource::Local { path, .. } => Some(path),
            DeckSource::Remote(_) => None,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve the input string to a loadable deck.
pub fn resolve_deck(input: &str) -> Result<DeckSource, ExportError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ExportError::InvalidInput {
            input: input.to_string(),
        });
    }
    if is_url(input) {
        if input.contains(char::is_whitespace) {
            return Err(ExportError::InvalidInput {
                input: input.to_string(),
            });
        }
        debug!("Resolved remote deck: {}", input);
        return Ok(DeckSource::Remote(input.to_string()));
    }
    resolve_local(input)
}

/// Resolve a local file path, validating existence and read permission.
fn resolve_local(path_str: &str) -> Result<DeckSource, ExportError> {
    let path = PathBuf::from(path_str);

    if !path.is_file() {
        return Err(ExportError::DeckNotFound { path });
    }

    match std::fs::File::open(&path) {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(ExportError::PermissionDenied { path });
        }
        Err(_) => {
            return Err(ExportError::DeckNotFound { path });
        }
    }

    let is_html = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("html") || e.eq_ignore_ascii_case("htm"));
    if !is_html {
        warn!(
            "'{}' does not have an .html extension; loading it anyway",
            path.display()
        );
    }

    let path = path
        .canonicalize()
        .map_err(|_| ExportError::DeckNotFound { path: path.clone() })?;
    let url = file_url(&path);

    debug!("Resolved local deck: {} → {}", path.display(), url);
    Ok(DeckSource::Local { path, url })
}

/// Build a `file://` URL for an absolute path, percent-encoding every byte
/// outside the URL-safe path set.
///
/// On Unix the raw path bytes are encoded, so names that are not valid UTF-8
/// still map to the file on disk.
pub fn file_url(path: &Path) -> String {
    let raw = path_bytes(path);
    let mut url = String::from("file://");
    if !matches!(raw.first(), Some(b'/' | b'\\')) {
        url.push('/');
    }
    for &byte in raw.iter() {
        match byte {
            b'\\' => url.push('/'),
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' | b':' => {
                url.push(byte as char)
            }
            _ => url.push_str(&format!("%{byte:02X}")),
        }
    }
    url
}

#[cfg(unix)]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn path_bytes(path: &Path) -> Cow<'_, [u8]> {
    match path.to_string_lossy() {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/deck.html"));
        assert!(is_url("http://localhost:8000/"));
        assert!(!is_url("/tmp/deck.html"));
        assert!(!is_url("deck.html"));
        assert!(!is_url(""));
    }

    #[test]
    fn remote_deck_passes_through() {
        let deck = resolve_deck("https://example.com/talk.html").unwrap();
        assert_eq!(deck.url(), "https://example.com/talk.html");
        assert!(deck.path().is_none());
    }

    #[test]
    fn empty_input_is_invalid() {
        assert!(matches!(
            resolve_deck("   "),
            Err(ExportError::InvalidInput { .. })
        ));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = resolve_deck("/definitely/not/a/real/deck.html").unwrap_err();
        assert!(matches!(err, ExportError::DeckNotFound { .. }));
    }

    #[test]
    fn directory_is_not_a_deck() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_deck(dir.path().to_str().unwrap()).unwrap_err();
        assert!(matches!(err, ExportError::DeckNotFound { .. }));
    }

    #[test]
    fn local_deck_becomes_file_url() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("my talk.html");
        std::fs::write(&file, "<html></html>").unwrap();

        let deck = resolve_deck(file.to_str().unwrap()).unwrap();
        assert!(deck.url().starts_with("file://"));
        assert!(deck.url().ends_with("my%20talk.html"), "got {}", deck.url());
        assert_eq!(deck.path(), Some(file.canonicalize().unwrap().as_path()));
    }

    #[test]
    fn file_url_encodes_reserved_bytes() {
        assert_eq!(
            file_url(Path::new("/slides/a#b?.html")),
            "file:///slides/a%23b%3F.html"
        );
        assert_eq!(
            file_url(Path::new("C:\\decks\\talk.html")),
            "file:///C:/decks/talk.html"
        );
    }

    #[cfg(unix)]
    #[test]
    fn file_url_keeps_non_utf8_bytes() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = Path::new(OsStr::from_bytes(b"/decks/caf\xe9 talk.html"));
        assert_eq!(file_url(path), "file:///decks/caf%E9%20talk.html");
    }
}
