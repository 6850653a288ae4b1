//! Chunked plain-text document store.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// A slice of one source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub source: PathBuf,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentStore {
    chunks: Vec<Chunk>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.txt` file directly inside `dir`.
    pub fn load(dir: &Path, chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::Config(format!(
                "Knowledge directory not found: {}",
                dir.display()
            )));
        }

        let pattern = dir.join("*.txt");
        let paths = glob::glob(&pattern.to_string_lossy())
            .map_err(|e| Error::Config(format!("Invalid knowledge path: {}", e)))?;

        let mut store = Self::new();
        let mut files: Vec<PathBuf> = paths.filter_map(|p| p.ok()).collect();
        files.sort();

        for path in files {
            let content = std::fs::read_to_string(&path)?;
            store.add_document(path, &content, chunk_size, chunk_overlap);
        }

        tracing::info!(
            "Loaded {} chunks from {}",
            store.chunks.len(),
            dir.display()
        );
        Ok(store)
    }

    pub fn add_document(
        &mut self,
        source: impl Into<PathBuf>,
        content: &str,
        chunk_size: usize,
        chunk_overlap: usize,
    ) {
        let source = source.into();
        for text in split_text(content, chunk_size, chunk_overlap) {
            self.chunks.push(Chunk {
                source: source.clone(),
                text,
            });
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Up to `k` distinct chunks with the highest query-term overlap. Chunks
    /// sharing no term with the query are never returned.
    pub fn search(&self, query: &str, k: usize) -> Vec<&Chunk> {
        let terms = terms(query);
        if terms.is_empty() || k == 0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, usize, &Chunk)> = self
            .chunks
            .iter()
            .enumerate()
            .filter_map(|(idx, chunk)| {
                let lowered = chunk.text.to_lowercase();
                let score: usize = terms.iter().map(|t| lowered.matches(t.as_str()).count()).sum();
                (score > 0).then_some((score, idx, chunk))
            })
            .collect();

        // Highest score first; earlier chunks win ties.
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let mut seen = HashSet::new();
        scored
            .into_iter()
            .map(|(_, _, chunk)| chunk)
            .filter(|chunk| seen.insert(chunk.text.trim().to_string()))
            .take(k)
            .collect()
    }
}

/// Lowercased query words of three or more characters, deduplicated.
fn terms(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 3)
        .map(str::to_lowercase)
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

/// Split into windows of at most `chunk_size` characters that overlap by
/// `chunk_overlap`. Windows end at whitespace when one is available.
pub fn split_text(content: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<String> {
    let chars: Vec<char> = content.chars().collect();
    let chunk_size = chunk_size.max(1);
    let chunk_overlap = chunk_overlap.min(chunk_size - 1);
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < chars.len() {
        let mut end = (start + chunk_size).min(chars.len());
        if end < chars.len() {
            if let Some(ws) = chars[start..end].iter().rposition(|c| c.is_whitespace()) {
                if ws > chunk_overlap {
                    end = start + ws;
                }
            }
        }

        let text: String = chars[start..end].iter().collect();
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }

        if end >= chars.len() {
            break;
        }
        start = (end - chunk_overlap).max(start + 1);
    }

    chunks
}
