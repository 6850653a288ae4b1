//! Knowledge-base retrieval as a tool.

use std::sync::Arc;

use async_trait::async_trait;

use super::Tool;
use crate::error::Result;

/// Given a query, return a text answer. May be slow; may fail.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn answer(&self, query: &str) -> Result<String>;
}

/// `RAG_Search`: forwards the raw input to a [`Retriever`]. Retriever
/// failures propagate as `Err`.
pub struct RetrievalTool {
    retriever: Arc<dyn Retriever>,
}

impl RetrievalTool {
    pub fn new(retriever: Arc<dyn Retriever>) -> Self {
        Self { retriever }
    }
}

#[async_trait]
impl Tool for RetrievalTool {
    fn name(&self) -> &str {
        "RAG_Search"
    }

    fn description(&self) -> &str {
        "Search the document knowledge base for relevant information. Input: a natural-language query."
    }

    async fn call(&self, input: &str) -> Result<String> {
        let query = input.trim().trim_matches('"');
        tracing::debug!(query, "Knowledge base lookup");
        self.retriever.answer(query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    struct Fixed(&'static str);

    #[async_trait]
    impl Retriever for Fixed {
        async fn answer(&self, query: &str) -> Result<String> {
            Ok(format!("{} -> {}", query, self.0))
        }
    }

    struct Down;

    #[async_trait]
    impl Retriever for Down {
        async fn answer(&self, _query: &str) -> Result<String> {
            Err(Error::Tool("vector store offline".to_string()))
        }
    }

    #[tokio::test]
    async fn forwards_query() {
        let tool = RetrievalTool::new(Arc::new(Fixed("42")));
        assert_eq!(tool.call(" \"meaning of life\" ").await.unwrap(), "meaning of life -> 42");
    }

    #[tokio::test]
    async fn failures_propagate() {
        let tool = RetrievalTool::new(Arc::new(Down));
        let err = tool.call("anything").await.unwrap_err();
        assert!(err.to_string().contains("vector store offline"));
    }
}
