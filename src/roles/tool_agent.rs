//! Tool-augmented reasoning loop (ReAct).
//!
//! Each step asks the engine to continue the scratchpad. The reply either
//! names a tool to call (`Action:` / `Action Input:`), gives the answer
//! (`Final Answer:`), or is free text, which is taken as the answer.

use std::sync::Arc;

use regex::Regex;

use super::prompts;
use crate::agent::{execute_with_contract, ExecutionContract};
use crate::error::Result;
use crate::providers::Provider;
use crate::tools::{self, Tool};

pub const DEFAULT_MAX_ITERATIONS: usize = 3;

const FINAL_ANSWER: &str = "Final Answer:";

/// One parsed engine reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Final(String),
    Action {
        /// Reply text up to and including the action input.
        log: String,
        tool: String,
        input: String,
    },
    /// Neither marker found. Treated as the answer.
    Unparsed(String),
}

pub fn parse_step(output: &str) -> Step {
    let action = parse_action(output);
    let final_at = output.find(FINAL_ANSWER);

    match (action, final_at) {
        (Some((start, step)), Some(at)) if start < at => step,
        (Some((_, step)), None) => step,
        (_, Some(at)) => Step::Final(output[at + FINAL_ANSWER.len()..].trim().to_string()),
        (None, None) => Step::Unparsed(output.trim().to_string()),
    }
}

fn parse_action(output: &str) -> Option<(usize, Step)> {
    let re = Regex::new(r"(?s)Action\s*\d*\s*:[\s]*(.*?)[\s]*Action\s*\d*\s*Input\s*\d*\s*:[\s]*(.*)").ok()?;
    let caps = re.captures(output)?;
    let whole = caps.get(0)?;
    let tool = caps.get(1)?.as_str().trim().trim_matches('*').trim().to_string();

    // Models often hallucinate the observation; cut it off.
    let raw_input = caps.get(2)?.as_str();
    let input_end = ["\nObservation", "\nFinal Answer:", "\nThought:"]
        .iter()
        .filter_map(|marker| raw_input.find(marker))
        .min()
        .unwrap_or(raw_input.len());
    let input = raw_input[..input_end].trim().trim_matches('"').to_string();
    let log_end = caps.get(2)?.start() + input_end;

    Some((
        whole.start(),
        Step::Action {
            log: output[..log_end].trim_end().to_string(),
            tool,
            input,
        },
    ))
}

pub struct ToolAgent {
    provider: Arc<dyn Provider>,
    contract: ExecutionContract,
    temperature: f32,
    system: String,
    tools: Vec<Arc<dyn Tool>>,
    max_iterations: usize,
}

impl ToolAgent {
    pub fn new(provider: Arc<dyn Provider>, system: impl Into<String>, tools: Vec<Arc<dyn Tool>>) -> Self {
        Self {
            provider,
            contract: ExecutionContract::default(),
            temperature: 0.0,
            system: system.into(),
            tools,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
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

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    fn prompt(&self, question: &str, scratchpad: &str) -> String {
        prompts::react(
            &self.system,
            &tools::describe(&self.tools),
            &self.tool_names().join(", "),
            question,
            scratchpad,
        )
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let text = execute_with_contract(self.provider.as_ref(), prompt, self.temperature, &self.contract).await?;
        Ok(text)
    }

    async fn observe(&self, tool: &str, input: &str) -> Result<String> {
        match self.tools.iter().find(|t| t.name() == tool) {
            Some(t) => {
                tracing::debug!(tool, input, "Calling tool");
                t.call(input).await
            }
            None => Ok(format!(
                "[Error] {} is not a valid tool, try one of [{}].",
                tool,
                self.tool_names().join(", ")
            )),
        }
    }

    /// Answer `question`. Engine and tool failures propagate.
    pub async fn run(&self, question: &str) -> Result<String> {
        let mut scratchpad = String::new();

        for iteration in 1..=self.max_iterations {
            let output = self.generate(&self.prompt(question, &scratchpad)).await?;

            match parse_step(&output) {
                Step::Final(answer) => return Ok(answer),
                Step::Unparsed(text) => {
                    tracing::debug!(iteration, "No ReAct markers, using reply as answer");
                    return Ok(text);
                }
                Step::Action { log, tool, input } => {
                    let observation = self.observe(&tool, &input).await?;
                    scratchpad.push_str(&log);
                    scratchpad.push_str("\nObservation: ");
                    scratchpad.push_str(&observation);
                    scratchpad.push_str("\nThought: ");
                }
            }
        }

        tracing::debug!(max = self.max_iterations, "Iteration limit reached, asking for final answer");
        scratchpad.push_str("\n\nI now need to return a final answer based on the previous steps:");
        let output = self.generate(&self.prompt(question, &scratchpad)).await?;
        Ok(match parse_step(&output) {
            Step::Final(answer) | Step::Unparsed(answer) => answer,
            Step::Action { log, .. } => log,
        })
    }
}
