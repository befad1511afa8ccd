//! File I/O for native CLI

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use inkmark_core::{HighlightConfig, KeyValueStore, MarkupTree, StorageError};

/// Source document as read from disk
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub title: String,
    pub path: PathBuf,
    /// Markup with at least one marked container
    pub markup: String,
}

/// Container id given to documents that mark none themselves
pub const DOCUMENT_CONTAINER: &str = "document";

/// Load a markup or plain-text file
pub fn load_file(path: &str, config: &HighlightConfig) -> Result<LoadedDocument> {
    let path = Path::new(path);
    let canonical = path
        .canonicalize()
        .with_context(|| format!("Failed to resolve path: {}", path.display()))?;

    let content = fs::read_to_string(&canonical)
        .with_context(|| format!("Failed to read file: {}", canonical.display()))?;

    let title = canonical
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "Untitled".to_string());

    let markup = if is_markup_file(&canonical) {
        ensure_container(&content, config)?
    } else {
        wrap_container(&html_escape::encode_text(&content), config)
    };

    Ok(LoadedDocument {
        title,
        path: canonical,
        markup,
    })
}

fn is_markup_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| matches!(ext.to_ascii_lowercase().as_str(), "html" | "htm" | "xhtml"))
}

/// Wrap the whole markup in one container unless it already marks some
pub fn ensure_container(markup: &str, config: &HighlightConfig) -> Result<String> {
    let tree = MarkupTree::parse(markup, config).context("Failed to parse markup")?;
    if tree.container_ids().is_empty() {
        Ok(wrap_container(markup, config))
    } else {
        Ok(markup.to_string())
    }
}

fn wrap_container(inner: &str, config: &HighlightConfig) -> String {
    format!(
        "<div {}=\"{}\">{}</div>",
        config.container_attribute, DOCUMENT_CONTAINER, inner
    )
}

/// Write highlighted markup to `<exports_dir>/<title>.highlighted.html`
pub fn export_markup(exports_dir: &Path, title: &str, markup: &str) -> Result<PathBuf> {
    fs::create_dir_all(exports_dir)
        .with_context(|| format!("Failed to create {}", exports_dir.display()))?;

    let export_path = exports_dir.join(format!("{}.highlighted.html", title));
    fs::write(&export_path, markup)
        .with_context(|| format!("Failed to write {}", export_path.display()))?;

    Ok(export_path)
}

const KEY_ESCAPES: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-');

/// Keyed store with one JSON file per key
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// One file per key; every byte but ASCII alphanumerics and `-` is
    /// percent-encoded, so distinct keys never share a file
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name = utf8_percent_encode(key, KEY_ESCAPES);
        self.dir.join(format!("{}.json", name))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        // Write-then-rename so a crash never leaves half a record
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkmark_core::{HighlightColor, Session};
    use pretty_assertions::{assert_eq, assert_ne};
    use tempfile::TempDir;

    #[test]
    fn test_file_store_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = FileStore::new(temp_dir.path().join("sessions"));

        assert_eq!(store.get("inkmark:a").unwrap(), None);
        store.set("inkmark:a", "{}").unwrap();
        assert_eq!(store.get("inkmark:a").unwrap().as_deref(), Some("{}"));
        assert!(store.path_for("inkmark:a").ends_with("inkmark%3Aa.json"));

        store.remove("inkmark:a").unwrap();
        assert_eq!(store.get("inkmark:a").unwrap(), None);
        store.remove("inkmark:a").unwrap();
    }

    #[test]
    fn test_keys_never_share_a_file() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("sessions");
        let store = FileStore::new(&dir);
        assert_ne!(store.path_for("attempt:42"), store.path_for("attempt_42"));
        assert_ne!(store.path_for("attempt%3A42"), store.path_for("attempt:42"));

        let mut first = Session::open(FileStore::new(&dir), "attempt:42");
        first.add("p1", 4, 9, HighlightColor::Yellow, "quick");

        let second = Session::open(FileStore::new(&dir), "attempt_42");
        assert!(second.list("p1").is_empty());
        let reopened = Session::open(FileStore::new(&dir), "attempt:42");
        assert_eq!(reopened.list("p1").len(), 1);
    }

    #[test]
    fn test_session_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("sessions");

        let mut session = Session::open(FileStore::new(&dir), "attempt-42");
        let added = session
            .add("p1", 4, 9, HighlightColor::Yellow, "quick")
            .unwrap();

        let reopened = Session::open(FileStore::new(&dir), "attempt-42");
        assert_eq!(reopened.list("p1"), &[added]);

        let other = Session::open(FileStore::new(&dir), "attempt-43");
        assert!(other.list("p1").is_empty());
    }

    #[test]
    fn test_load_plain_text_gets_container() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notes.txt");
        fs::write(&path, "a < b & c").unwrap();

        let config = HighlightConfig::default();
        let doc = load_file(path.to_str().unwrap(), &config).unwrap();

        assert_eq!(doc.title, "notes");
        assert_eq!(
            doc.markup,
            "<div data-container-id=\"document\">a &lt; b &amp; c</div>"
        );
    }

    #[test]
    fn test_load_markup_keeps_containers() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("page.html");
        let markup = "<p data-container-id=\"p1\">One</p><p data-container-id=\"p2\">Two</p>";
        fs::write(&path, markup).unwrap();

        let doc = load_file(path.to_str().unwrap(), &HighlightConfig::default()).unwrap();
        assert_eq!(doc.markup, markup);
    }

    #[test]
    fn test_load_markup_without_containers() {
        let markup = "<p>One</p>";
        let wrapped = ensure_container(markup, &HighlightConfig::default()).unwrap();
        assert_eq!(wrapped, "<div data-container-id=\"document\"><p>One</p></div>");
    }

    #[test]
    fn test_export_markup() {
        let temp_dir = TempDir::new().unwrap();
        let path = export_markup(&temp_dir.path().join("exports"), "page", "<p>x</p>").unwrap();

        assert!(path.ends_with("page.highlighted.html"));
        assert_eq!(fs::read_to_string(path).unwrap(), "<p>x</p>");
    }
}
