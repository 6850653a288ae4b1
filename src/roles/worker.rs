//! Worker: performs one subtask per TASK_REQUEST with a tool-augmented agent.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use super::tool_agent::{ToolAgent, DEFAULT_MAX_ITERATIONS};
use super::{prompts, reject, Role};
use crate::agent::ExecutionContract;
use crate::error::{Error, Result};
use crate::protocol::{agents, meta, EnvelopeBuilder, MessageBus, MessageType};
use crate::providers::Provider;
use crate::tools::{RetrievalTool, Retriever, StaticCatalog, SummarizeTool, Tool, ToolCatalog};

/// True when the task explicitly asks for a knowledge-base lookup.
pub fn needs_retrieval(task: &str) -> bool {
    Regex::new(r"\bRAG\b|(?i:knowledge[\s_-]*base)")
        .map(|re| re.is_match(task))
        .unwrap_or(false)
}

pub struct Worker {
    bus: Arc<MessageBus>,
    provider: Arc<dyn Provider>,
    catalog: Arc<dyn ToolCatalog>,
    retriever: Option<Arc<dyn Retriever>>,
    contract: ExecutionContract,
    temperature: f32,
    max_iterations: usize,
}

impl Worker {
    /// Create a Worker and register its mailbox. Starts with no catalog tools.
    pub fn new(bus: Arc<MessageBus>, provider: Arc<dyn Provider>) -> Self {
        bus.register(agents::WORKER);
        Self {
            bus,
            provider,
            catalog: Arc::new(StaticCatalog::empty()),
            retriever: None,
            contract: ExecutionContract::default(),
            temperature: 0.0,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }

    pub fn with_catalog(mut self, catalog: Arc<dyn ToolCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_retriever(mut self, retriever: Arc<dyn Retriever>) -> Self {
        self.retriever = Some(retriever);
        self
    }

    pub fn with_contract(mut self, contract: ExecutionContract) -> Self {
        self.contract = contract;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    async fn tools_for(&self, task: &str) -> Vec<Arc<dyn Tool>> {
        let mut tools = self.catalog.discover().await;
        tools.push(Arc::new(SummarizeTool::new(
            self.provider.clone(),
            self.contract.clone(),
        )));

        if needs_retrieval(task) {
            match &self.retriever {
                Some(retriever) => tools.push(Arc::new(RetrievalTool::new(retriever.clone()))),
                None => tracing::warn!("Task asks for the knowledge base but none is configured"),
            }
        }
        tools
    }

    /// Run the reasoning loop on one subtask. Failures are returned as
    /// `Worker error: ...` text.
    pub async fn perform_task(&self, task: &str) -> String {
        let tools = self.tools_for(task).await;
        let agent = ToolAgent::new(self.provider.clone(), prompts::WORKER_SYSTEM, tools)
            .with_contract(self.contract.clone())
            .with_temperature(self.temperature)
            .with_max_iterations(self.max_iterations);

        match agent.run(task).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("Worker failed on task: {}", e);
                format!("Worker error: {}", e)
            }
        }
    }
}

#[async_trait]
impl Role for Worker {
    fn name(&self) -> &str {
        agents::WORKER
    }

    async fn process_once(&self, timeout: Duration) -> Result<bool> {
        let Some(envelope) = self.bus.receive(agents::WORKER, Some(timeout)).await? else {
            return Ok(false);
        };

        if envelope.message_type() != MessageType::TaskRequest {
            reject(&self.bus, agents::WORKER, &envelope)?;
            return Ok(true);
        }

        tracing::debug!(task_id = ?envelope.task_id(), "Worker picked up task");
        let output = self.perform_task(envelope.payload()).await;

        let response = EnvelopeBuilder::from(agents::WORKER)
            .to(agents::VERIFIER)
            .message_type(MessageType::TaskResponse)
            .payload(output)
            .meta_opt(meta::TASK_ID, envelope.task_id())
            .meta_opt(meta::SESSION_ID, envelope.session_id())
            .build()
            .map_err(|e| Error::Other(e.to_string()))?;
        self.bus.send(response)?;
        Ok(true)
    }
}
