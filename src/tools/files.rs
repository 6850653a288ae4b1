//! File search, read, and save tools.
//!
//! These never fail with `Err`: problems are reported as `[Error] ...` text so
//! the reasoning loop can see them and carry on.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

use super::{Tool, ToolArgs, ToolCatalog};
use crate::error::Result;

pub const DEFAULT_MAX_CHARS: usize = 5000;

fn resolve(root: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        root.join(candidate)
    }
}

/// Recursively find files under `root` whose path matches `pattern`.
/// Returns matching paths joined by newlines, sorted.
pub fn search(root: &Path, pattern: &str) -> String {
    let full = root.join("**").join(pattern);
    let full = full.to_string_lossy();

    let paths = match glob::glob(&full) {
        Ok(paths) => paths,
        Err(e) => return format!("[Error] Invalid pattern {}: {}", pattern, e),
    };

    let mut matches: Vec<String> = paths
        .filter_map(|entry| entry.ok())
        .map(|p| p.display().to_string())
        .collect();
    matches.sort();
    matches.dedup();
    matches.join("\n")
}

/// Read a text file, truncated to `max_chars` characters with `...` appended.
pub fn read(path: &Path, max_chars: usize) -> String {
    if !path.is_file() {
        return format!("[Error] File not found: {}", path.display());
    }
    match std::fs::read_to_string(path) {
        Ok(content) => {
            if content.chars().count() > max_chars {
                let truncated: String = content.chars().take(max_chars).collect();
                format!("{}...", truncated)
            } else {
                content
            }
        }
        Err(e) => format!("[Error] Could not read {}: {}", path.display(), e),
    }
}

/// Write `content` to `path`, replacing any existing file.
pub fn save(path: &Path, content: &str) -> String {
    match std::fs::write(path, content) {
        Ok(()) => {
            let shown = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
            format!("[Success] Saved file at {}", shown.display())
        }
        Err(e) => format!("[Error] Could not save file: {}", e),
    }
}

/// `file_search`: `{"root": ".", "pattern": "*.md"}` or a bare pattern.
pub struct FileSearchTool {
    root: PathBuf,
}

impl FileSearchTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl Tool for FileSearchTool {
    fn name(&self) -> &str {
        "file_search"
    }

    fn description(&self) -> &str {
        "Find files recursively. Input: {\"root\": \".\", \"pattern\": \"*.md\"} or just a glob pattern. Returns one path per line."
    }

    async fn call(&self, input: &str) -> Result<String> {
        let args = ToolArgs::parse(input);
        let (root, pattern) = if args.is_object() {
            (
                args.get_str("root").unwrap_or_else(|| ".".to_string()),
                args.get_str("pattern").unwrap_or_else(|| "*.md".to_string()),
            )
        } else {
            let raw = args.raw();
            let pattern = if raw.is_empty() { "*.md" } else { raw };
            (".".to_string(), pattern.to_string())
        };
        Ok(search(&resolve(&self.root, &root), &pattern))
    }
}

/// `read_file`: `{"path": "...", "max_chars": 5000}` or a bare path.
pub struct ReadFileTool {
    root: PathBuf,
    max_chars: usize,
}

impl ReadFileTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_chars: DEFAULT_MAX_CHARS,
        }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }
}

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a text file. Input: {\"path\": \"notes.txt\", \"max_chars\": 5000} or just a path."
    }

    async fn call(&self, input: &str) -> Result<String> {
        let args = ToolArgs::parse(input);
        let path = if args.is_object() {
            args.get_str("path").unwrap_or_default()
        } else {
            args.raw().to_string()
        };
        let max_chars = args.get_usize("max_chars").unwrap_or(self.max_chars);
        Ok(read(&resolve(&self.root, &path), max_chars))
    }
}

/// `save_file`: `{"path": "...", "content": "..."}`.
pub struct SaveFileTool {
    root: PathBuf,
}

impl SaveFileTool {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl Tool for SaveFileTool {
    fn name(&self) -> &str {
        "save_file"
    }

    fn description(&self) -> &str {
        "Save text to a file. Input: {\"path\": \"out.txt\", \"content\": \"...\"}."
    }

    async fn call(&self, input: &str) -> Result<String> {
        let args = ToolArgs::parse(input);
        let (Some(path), Some(content)) = (args.get_str("path"), args.get_str("content")) else {
            return Ok(
                "[Error] Could not save file: expected {\"path\": ..., \"content\": ...}".to_string(),
            );
        };
        Ok(save(&resolve(&self.root, &path), &content))
    }
}

/// Offers the three file tools rooted at one directory.
pub struct FileToolCatalog {
    root: PathBuf,
    enabled: bool,
    max_read_chars: usize,
}

impl FileToolCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            enabled: true,
            max_read_chars: DEFAULT_MAX_CHARS,
        }
    }

    pub fn from_settings(settings: &crate::config::ToolSettings) -> Self {
        Self {
            root: settings.root.clone().unwrap_or_else(|| PathBuf::from(".")),
            enabled: settings.enabled,
            max_read_chars: settings.max_read_chars,
        }
    }
}

#[async_trait]
impl ToolCatalog for FileToolCatalog {
    async fn discover(&self) -> Vec<Arc<dyn Tool>> {
        if !self.enabled {
            return Vec::new();
        }
        vec![
            Arc::new(FileSearchTool::new(self.root.clone())),
            Arc::new(ReadFileTool::new(self.root.clone()).with_max_chars(self.max_read_chars)),
            Arc::new(SaveFileTool::new(self.root.clone())),
        ]
    }
}
