//! Catalog of the book's chapter code snippets.
//!
//! Snippets live under `<dir>/Chapter_NN/examples/`. Each file is loaded
//! eagerly so lookups never touch the disk.

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, VibeError};

/// Maximum allowed snippet file size in bytes (100KB).
pub const MAX_SNIPPET_SIZE: u64 = 100 * 1024;

/// Language of a snippet, detected from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnippetLanguage {
    /// `.js`
    JavaScript,
    /// `.jsx`
    Jsx,
    /// `.ts`
    TypeScript,
    /// `.tsx`
    Tsx,
    /// `.py`
    Python,
    /// Anything else.
    Other,
}

impl SnippetLanguage {
    /// Detects the language from a file extension.
    #[must_use]
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "js" | "mjs" | "cjs" => Self::JavaScript,
            "jsx" => Self::Jsx,
            "ts" => Self::TypeScript,
            "tsx" => Self::Tsx,
            "py" => Self::Python,
            _ => Self::Other,
        }
    }

    /// Detects the language from a file path.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map_or(Self::Other, Self::from_extension)
    }

    /// Name passed to the code analyzer.
    #[must_use]
    pub const fn analyzer_name(self) -> &'static str {
        match self {
            Self::JavaScript | Self::Jsx => "javascript",
            Self::TypeScript | Self::Tsx => "typescript",
            Self::Python => "python",
            Self::Other => "text",
        }
    }
}

/// A loaded snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    /// Chapter number.
    pub chapter: u32,
    /// File name.
    pub name: String,
    /// Detected language.
    pub language: SnippetLanguage,
    /// File content.
    pub content: String,
    /// Size in bytes.
    pub size_bytes: usize,
}

/// Listing entry without the file content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnippetSummary {
    /// Chapter number.
    pub chapter: u32,
    /// File name.
    pub name: String,
    /// Detected language.
    pub language: SnippetLanguage,
    /// Size in bytes.
    pub size_bytes: usize,
}

impl From<&Snippet> for SnippetSummary {
    fn from(snippet: &Snippet) -> Self {
        Self {
            chapter: snippet.chapter,
            name: snippet.name.clone(),
            language: snippet.language,
            size_bytes: snippet.size_bytes,
        }
    }
}

/// All snippets, ordered by chapter then file name.
#[derive(Debug, Clone, Default)]
pub struct SnippetCatalog {
    snippets: Vec<Snippet>,
}

impl SnippetCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans `dir` for `Chapter_NN/examples/*` files.
    ///
    /// A missing directory yields an empty catalog. Directories that do not
    /// match `Chapter_NN` are ignored, as are chapters without an `examples`
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns `VibeError::SnippetTooLarge` if a file exceeds 100KB,
    /// `VibeError::SnippetEncodingError` if a file is not valid UTF-8, and
    /// `VibeError::Io` for other read failures.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "Snippet directory not found, catalog is empty");
            return Ok(Self::new());
        }

        let Ok(chapter_re) = Regex::new(r"^Chapter_(\d+)$") else {
            return Ok(Self::new());
        };

        let mut snippets = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let Some(chapter) = chapter_re
                .captures(name)
                .and_then(|cap| cap.get(1))
                .and_then(|m| m.as_str().parse::<u32>().ok())
            else {
                continue;
            };

            let examples_dir = entry.path().join("examples");
            if !examples_dir.is_dir() {
                debug!(chapter, "Chapter has no examples directory");
                continue;
            }

            for file in std::fs::read_dir(&examples_dir)? {
                let path = file?.path();
                if path.is_file() {
                    snippets.push(load_snippet(chapter, &path)?);
                }
            }
        }

        snippets.sort_by(|a, b| (a.chapter, &a.name).cmp(&(b.chapter, &b.name)));
        info!(dir = %dir.display(), count = snippets.len(), "Loaded snippet catalog");
        Ok(Self { snippets })
    }

    /// Number of snippets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snippets.len()
    }

    /// Returns `true` if the catalog has no snippets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    /// Listing of every snippet.
    #[must_use]
    pub fn list(&self) -> Vec<SnippetSummary> {
        self.snippets.iter().map(SnippetSummary::from).collect()
    }

    /// Listing of one chapter's snippets.
    #[must_use]
    pub fn chapter(&self, chapter: u32) -> Vec<SnippetSummary> {
        self.snippets
            .iter()
            .filter(|s| s.chapter == chapter)
            .map(SnippetSummary::from)
            .collect()
    }

    /// Looks up a snippet by chapter and file name.
    ///
    /// # Errors
    ///
    /// Returns `VibeError::SnippetNotFound` if there is no such snippet.
    pub fn get(&self, chapter: u32, name: &str) -> Result<&Snippet> {
        self.snippets
            .iter()
            .find(|s| s.chapter == chapter && s.name == name)
            .ok_or_else(|| VibeError::snippet_not_found(chapter, name))
    }
}

fn load_snippet(chapter: u32, path: &Path) -> Result<Snippet> {
    let file_size = std::fs::metadata(path)?.len();
    if file_size > MAX_SNIPPET_SIZE {
        return Err(VibeError::snippet_too_large(path, file_size / 1024));
    }

    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::InvalidData {
            VibeError::snippet_encoding(path)
        } else {
            VibeError::Io(e)
        }
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(Snippet {
        chapter,
        language: SnippetLanguage::from_path(path),
        size_bytes: content.len(),
        name,
        content,
    })
}

/// Returns the book directory's path for a chapter, e.g. `Chapter_03`.
#[must_use]
pub fn chapter_dir(root: &Path, chapter: u32) -> PathBuf {
    root.join(format!("Chapter_{chapter:02}"))
}
