//! Planner: decomposes a request, dispatches subtasks, and gathers verified results.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::time::Instant;

use super::prompts;
use crate::agent::{execute_with_contract, ExecutionContract};
use crate::error::{Error, Result};
use crate::protocol::{agents, meta, EnvelopeBuilder, MessageBus, MessageType};
use crate::providers::Provider;

pub const DEFAULT_COLLECT_POLL: Duration = Duration::from_millis(50);

/// How collected results are joined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResultOrder {
    #[default]
    Arrival,
    TaskId,
}

/// One verified result received by the Planner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    pub task_id: Option<u64>,
    pub payload: String,
}

#[derive(Deserialize)]
struct Plan {
    subtasks: Vec<serde_json::Value>,
}

fn plan_from_json(text: &str) -> Option<Vec<String>> {
    let plan: Plan = serde_json::from_str(text).ok()?;
    let subtasks: Vec<String> = plan
        .subtasks
        .into_iter()
        .filter_map(|v| match v {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        })
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    (!subtasks.is_empty()).then_some(subtasks)
}

/// Extract the subtask list from an engine reply: the whole reply as JSON,
/// then the span from the first `{` to the last `}`. `None` if neither
/// yields a non-empty list.
pub fn parse_subtasks(output: &str) -> Option<Vec<String>> {
    let trimmed = output.trim();
    if let Some(subtasks) = plan_from_json(trimmed) {
        return Some(subtasks);
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end <= start {
        return None;
    }
    plan_from_json(&trimmed[start..=end])
}

pub struct Planner {
    bus: Arc<MessageBus>,
    provider: Arc<dyn Provider>,
    contract: ExecutionContract,
    temperature: f32,
    collect_poll: Duration,
    order: ResultOrder,
    session_id: Option<String>,
    expected_results: usize,
    results: Vec<TaskResult>,
}

impl Planner {
    /// Create a Planner and register its mailbox.
    pub fn new(bus: Arc<MessageBus>, provider: Arc<dyn Provider>) -> Self {
        bus.register(agents::PLANNER);
        Self {
            bus,
            provider,
            contract: ExecutionContract::default(),
            temperature: 0.0,
            collect_poll: DEFAULT_COLLECT_POLL,
            order: ResultOrder::default(),
            session_id: None,
            expected_results: 0,
            results: Vec::new(),
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

    pub fn with_collect_poll(mut self, poll: Duration) -> Self {
        self.collect_poll = poll;
        self
    }

    pub fn with_result_order(mut self, order: ResultOrder) -> Self {
        self.order = order;
        self
    }

    pub fn name(&self) -> &str {
        agents::PLANNER
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn expected_results(&self) -> usize {
        self.expected_results
    }

    pub fn results(&self) -> &[TaskResult] {
        &self.results
    }

    /// Ask the engine for an ordered subtask list. Never fails: any engine or
    /// parse problem yields `[request]`.
    pub async fn create_subtasks(&self, request: &str) -> Vec<String> {
        let prompt = prompts::decomposition(request);
        let output =
            match execute_with_contract(self.provider.as_ref(), &prompt, self.temperature, &self.contract).await {
                Ok(output) => output,
                Err(e) => {
                    tracing::warn!("Decomposition failed, using request as the only subtask: {}", e);
                    return vec![request.to_string()];
                }
            };

        match parse_subtasks(&output) {
            Some(subtasks) => subtasks,
            None => {
                tracing::warn!("Unparseable plan, using request as the only subtask");
                tracing::debug!(output = %output, "Planner output");
                vec![request.to_string()]
            }
        }
    }

    /// Start a new session and send one TASK_REQUEST per subtask to the
    /// Worker. Returns the number dispatched.
    pub async fn process_user_request(&mut self, request: &str) -> Result<usize> {
        let stale = self.bus.drain(agents::PLANNER)?;
        if !stale.is_empty() {
            tracing::debug!(count = stale.len(), "Discarded stale planner mail");
        }

        let session = ulid::Ulid::new().to_string();
        self.session_id = Some(session.clone());
        self.results.clear();

        let subtasks = self.create_subtasks(request).await;
        let total = subtasks.len();
        self.expected_results = total;
        tracing::info!(session = %session, total, "Dispatching subtasks");

        for (idx, subtask) in subtasks.into_iter().enumerate() {
            let envelope = EnvelopeBuilder::from(agents::PLANNER)
                .to(agents::WORKER)
                .message_type(MessageType::TaskRequest)
                .payload(subtask)
                .meta(meta::TASK_ID, (idx + 1) as u64)
                .meta(meta::TOTAL, total as u64)
                .meta(meta::ORIGINAL_REQUEST, request)
                .meta(meta::SESSION_ID, session.as_str())
                .build()
                .map_err(|e| Error::Other(e.to_string()))?;
            self.bus.send(envelope)?;
        }

        Ok(total)
    }

    /// Gather TASK_RESULTs of the current session for up to `max_wait`, or
    /// until every dispatched subtask has reported. Returns the payloads
    /// joined by blank lines; empty if nothing arrived.
    pub async fn collect_results(&mut self, max_wait: Duration) -> Result<String> {
        let deadline = Instant::now() + max_wait;

        while self.results.len() < self.expected_results {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            let Some(envelope) = self
                .bus
                .receive(agents::PLANNER, Some(remaining.min(self.collect_poll)))
                .await?
            else {
                continue;
            };

            match envelope.message_type() {
                MessageType::TaskResult => {
                    if self.session_id.is_none() || envelope.session_id() != self.session_id.as_deref() {
                        tracing::debug!(
                            session = ?envelope.session_id(),
                            "Discarded result from another session"
                        );
                        continue;
                    }
                    self.results.push(TaskResult {
                        task_id: envelope.meta_u64(meta::FROM_TASK_ID),
                        payload: envelope.payload().to_string(),
                    });
                }
                MessageType::Error => {
                    tracing::warn!(from = envelope.sender(), "Error reported: {}", envelope.payload());
                }
                other => {
                    tracing::warn!(from = envelope.sender(), kind = %other, "Planner ignored message");
                }
            }
        }

        if self.results.len() < self.expected_results {
            tracing::info!(
                received = self.results.len(),
                expected = self.expected_results,
                "Collection ended with partial results"
            );
        }

        Ok(self.joined())
    }

    fn joined(&self) -> String {
        let mut results: Vec<&TaskResult> = self.results.iter().collect();
        if self.order == ResultOrder::TaskId {
            results.sort_by_key(|r| r.task_id.unwrap_or(u64::MAX));
        }
        results
            .iter()
            .map(|r| r.payload.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
