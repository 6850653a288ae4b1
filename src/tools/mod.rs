//! Tools the Worker's reasoning loop can invoke, and the catalogs that supply them.
//!
//! Tools report problems in two ways. Expected, user-facing failures (a
//! missing file, a bad pattern) come back as `[Error] ...` strings and are
//! treated as ordinary content. Infrastructure failures (the retriever is
//! down) come back as `Err` and abort the current task.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;

pub mod files;
pub mod retrieval;
pub mod summarize;

pub use files::{FileSearchTool, FileToolCatalog, ReadFileTool, SaveFileTool};
pub use retrieval::{RetrievalTool, Retriever};
pub use summarize::SummarizeTool;

/// A named capability with a free-text input.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    /// One-line description shown to the reasoning engine.
    fn description(&self) -> &str;

    async fn call(&self, input: &str) -> Result<String>;
}

/// Source of tools, consulted once per task.
#[async_trait]
pub trait ToolCatalog: Send + Sync {
    async fn discover(&self) -> Vec<Arc<dyn Tool>>;
}

/// A fixed list of tools.
#[derive(Clone, Default)]
pub struct StaticCatalog {
    tools: Vec<Arc<dyn Tool>>,
}

impl StaticCatalog {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self { tools }
    }

    pub fn empty() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ToolCatalog for StaticCatalog {
    async fn discover(&self) -> Vec<Arc<dyn Tool>> {
        self.tools.clone()
    }
}

/// Tool input: either a JSON object of named arguments or a bare string.
#[derive(Debug, Clone)]
pub struct ToolArgs {
    object: Option<Map<String, Value>>,
    raw: String,
}

impl ToolArgs {
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        let object = match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        };
        let raw = trimmed
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(trimmed)
            .to_string();
        Self { object, raw }
    }

    /// Named argument as text. Numbers and booleans are stringified.
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.object.as_ref()?.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        match self.object.as_ref()?.get(key)? {
            Value::Number(n) => n.as_u64().map(|n| n as usize),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn is_object(&self) -> bool {
        self.object.is_some()
    }

    /// The input as given, with one layer of surrounding quotes removed.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

/// Render tools as `name: description` lines for a prompt.
pub fn describe(tools: &[Arc<dyn Tool>]) -> String {
    tools
        .iter()
        .map(|t| format!("{}: {}", t.name(), t.description()))
        .collect::<Vec<_>>()
        .join("\n")
}
