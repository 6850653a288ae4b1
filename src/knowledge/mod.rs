//! Document knowledge base backing the `RAG_Search` tool.

use std::sync::Arc;

use async_trait::async_trait;

use crate::agent::{execute_with_contract, ExecutionContract};
use crate::config::KnowledgeSettings;
use crate::error::Result;
use crate::providers::Provider;
use crate::tools::Retriever;

pub mod store;

pub use store::{Chunk, DocumentStore};

pub const NO_DOCUMENTS: &str = "No relevant documents found in the knowledge base.";

/// Answers questions from the most relevant document chunks.
pub struct KnowledgeBase {
    store: DocumentStore,
    provider: Arc<dyn Provider>,
    contract: ExecutionContract,
    top_k: usize,
    temperature: f32,
}

impl KnowledgeBase {
    pub fn new(store: DocumentStore, provider: Arc<dyn Provider>) -> Self {
        let defaults = KnowledgeSettings::default();
        Self {
            store,
            provider,
            contract: ExecutionContract::default(),
            top_k: defaults.top_k,
            temperature: defaults.temperature,
        }
    }

    /// Load `settings.docs_dir`. Returns `Ok(None)` when no directory is configured.
    pub fn from_settings(
        settings: &KnowledgeSettings,
        provider: Arc<dyn Provider>,
        contract: ExecutionContract,
    ) -> Result<Option<Self>> {
        let Some(dir) = settings.docs_dir.as_ref() else {
            return Ok(None);
        };
        let store = DocumentStore::load(dir, settings.chunk_size, settings.chunk_overlap)?;
        Ok(Some(Self {
            store,
            provider,
            contract,
            top_k: settings.top_k,
            temperature: settings.temperature,
        }))
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_contract(mut self, contract: ExecutionContract) -> Self {
        self.contract = contract;
        self
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }
}

fn answer_prompt(context: &str, question: &str) -> String {
    format!(
        "Use the following pieces of context to answer the question at the end. \
         If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\n\
         {}\n\nQuestion: {}\nHelpful Answer:",
        context, question
    )
}

#[async_trait]
impl Retriever for KnowledgeBase {
    async fn answer(&self, query: &str) -> Result<String> {
        let hits = self.store.search(query, self.top_k);
        if hits.is_empty() {
            tracing::debug!(query, "No matching chunks");
            return Ok(NO_DOCUMENTS.to_string());
        }

        let context = hits
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        tracing::debug!(query, chunks = hits.len(), "Answering from knowledge base");

        let prompt = answer_prompt(&context, query);
        let text =
            execute_with_contract(self.provider.as_ref(), &prompt, self.temperature, &self.contract)
                .await?;
        Ok(text.trim().to_string())
    }
}
