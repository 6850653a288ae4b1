//! Engine-backed summarization tool.

use std::sync::Arc;

use async_trait::async_trait;

use super::Tool;
use crate::agent::{execute_with_contract, ExecutionContract};
use crate::error::Result;
use crate::providers::Provider;

pub struct SummarizeTool {
    provider: Arc<dyn Provider>,
    contract: ExecutionContract,
    name: String,
    description: String,
}

impl SummarizeTool {
    pub fn new(provider: Arc<dyn Provider>, contract: ExecutionContract) -> Self {
        Self {
            provider,
            contract,
            name: "Summarize".to_string(),
            description: "Summarize text succinctly.".to_string(),
        }
    }

    /// Same behavior under a different name, e.g. a "Condense" step.
    pub fn named(mut self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.name = name.into();
        self.description = description.into();
        self
    }
}

#[async_trait]
impl Tool for SummarizeTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn call(&self, input: &str) -> Result<String> {
        let prompt = format!("Summarize clearly and briefly:\n\n{}", input);
        let text = execute_with_contract(self.provider.as_ref(), &prompt, 0.0, &self.contract).await?;
        Ok(text.trim().to_string())
    }
}
