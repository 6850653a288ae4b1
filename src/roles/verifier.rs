//! Verifier: cleans up each Worker result and returns it to the Planner.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::tool_agent::ToolAgent;
use super::{prompts, reject, Role};
use crate::agent::{execute_with_contract, ExecutionContract};
use crate::error::{Error, Result};
use crate::protocol::{agents, meta, EnvelopeBuilder, MessageBus, MessageType};
use crate::providers::Provider;
use crate::tools::SummarizeTool;

pub struct Verifier {
    bus: Arc<MessageBus>,
    provider: Arc<dyn Provider>,
    contract: ExecutionContract,
    temperature: f32,
}

impl Verifier {
    /// Create a Verifier and register its mailbox.
    pub fn new(bus: Arc<MessageBus>, provider: Arc<dyn Provider>) -> Self {
        bus.register(agents::VERIFIER);
        Self {
            bus,
            provider,
            contract: ExecutionContract::default(),
            temperature: 0.0,
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

    /// Improved text, or the original prefixed with `Verification error: ...`.
    pub async fn verify(&self, text: &str) -> String {
        let prompt = prompts::verification(text);
        match execute_with_contract(self.provider.as_ref(), &prompt, self.temperature, &self.contract).await {
            Ok(verified) => verified.trim().to_string(),
            Err(e) => {
                tracing::warn!("Verification failed: {}", e);
                format!("Verification error: {}\n\n{}", e, text)
            }
        }
    }

    /// Check a multi-part bundle with the reasoning loop and a `Condense`
    /// tool. Used by the sequential pipeline.
    pub async fn verify_bundle(&self, bundle: &str) -> String {
        let condense = SummarizeTool::new(self.provider.clone(), self.contract.clone()).named(
            "Condense",
            "Condense and clean up multi-part results into a single coherent answer.",
        );
        let agent = ToolAgent::new(
            self.provider.clone(),
            prompts::VERIFIER_SYSTEM,
            vec![Arc::new(condense)],
        )
        .with_contract(self.contract.clone())
        .with_temperature(self.temperature);

        match agent.run(bundle).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!("Bundle verification failed: {}", e);
                format!("Verification error: {}\n\n{}", e, bundle)
            }
        }
    }
}

#[async_trait]
impl Role for Verifier {
    fn name(&self) -> &str {
        agents::VERIFIER
    }

    async fn process_once(&self, timeout: Duration) -> Result<bool> {
        let Some(envelope) = self.bus.receive(agents::VERIFIER, Some(timeout)).await? else {
            return Ok(false);
        };

        if envelope.message_type() != MessageType::TaskResponse {
            reject(&self.bus, agents::VERIFIER, &envelope)?;
            return Ok(true);
        }

        let verified = self.verify(envelope.payload()).await;

        let result = EnvelopeBuilder::from(agents::VERIFIER)
            .to(agents::PLANNER)
            .message_type(MessageType::TaskResult)
            .payload(verified)
            .meta_opt(meta::FROM_TASK_ID, envelope.task_id())
            .meta_opt(meta::SESSION_ID, envelope.session_id())
            .build()
            .map_err(|e| Error::Other(e.to_string()))?;
        self.bus.send(result)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Envelope;
    use crate::providers::provider::testing::{EchoProvider, ScriptedProvider};

    fn response(task_id: u64, payload: &str) -> Envelope {
        EnvelopeBuilder::from(agents::WORKER)
            .to(agents::VERIFIER)
            .message_type(MessageType::TaskResponse)
            .payload(payload)
            .meta(meta::TASK_ID, task_id)
            .meta(meta::SESSION_ID, "s9")
            .build()
            .unwrap()
    }

    fn bus() -> Arc<MessageBus> {
        let bus = Arc::new(MessageBus::new());
        bus.register(agents::PLANNER);
        bus.register(agents::WORKER);
        bus
    }

    #[tokio::test]
    async fn verified_result_goes_to_planner() {
        let bus = bus();
        let verifier = Verifier::new(bus.clone(), Arc::new(EchoProvider));
        bus.send(response(3, "raw text")).unwrap();

        assert!(verifier.process_once(Duration::from_millis(100)).await.unwrap());
        let result = bus.try_receive(agents::PLANNER).unwrap().unwrap();
        assert_eq!(result.message_type(), MessageType::TaskResult);
        assert_eq!(result.payload(), "raw text");
        assert_eq!(result.meta_u64(meta::FROM_TASK_ID), Some(3));
        assert_eq!(result.session_id(), Some("s9"));
    }

    #[tokio::test]
    async fn failure_keeps_original_text() {
        let verifier = Verifier::new(bus(), Arc::new(ScriptedProvider::failing("rate limited")))
            .with_contract(ExecutionContract::once(Duration::from_secs(1)));
        let out = verifier.verify("the draft").await;
        assert!(out.starts_with("Verification error: "));
        assert!(out.ends_with("\n\nthe draft"));
    }

    #[tokio::test]
    async fn bundle_can_use_condense() {
        let provider = Arc::new(
            ScriptedProvider::new(["Action: Condense\nAction Input: part one, part two"])
                .then_ok("one and two")
                .then_ok("Final Answer: one and two, checked"),
        );
        let verifier = Verifier::new(bus(), provider.clone())
            .with_contract(ExecutionContract::once(Duration::from_secs(1)));

        let out = verifier.verify_bundle("[Subtask 1] a\npart one").await;
        assert_eq!(out, "one and two, checked");
        assert!(provider.prompts()[1].starts_with("Summarize clearly and briefly:"));
        assert!(provider.prompts()[2].contains("Observation: one and two"));
    }

    #[tokio::test]
    async fn idle_mailbox_times_out() {
        let verifier = Verifier::new(bus(), Arc::new(EchoProvider));
        let started = std::time::Instant::now();
        assert!(!verifier.process_once(Duration::from_millis(30)).await.unwrap());
        assert!(started.elapsed() >= Duration::from_millis(25));
    }

    #[tokio::test]
    async fn task_requests_are_rejected() {
        let bus = bus();
        let verifier = Verifier::new(bus.clone(), Arc::new(EchoProvider));
        bus.send(Envelope::new(agents::WORKER, agents::VERIFIER, MessageType::TaskRequest, "?"))
            .unwrap();

        assert!(verifier.process_once(Duration::from_millis(50)).await.unwrap());
        assert_eq!(
            bus.try_receive(agents::WORKER).unwrap().unwrap().message_type(),
            MessageType::Error
        );
        assert_eq!(bus.pending(agents::PLANNER).unwrap(), 0);
    }
}
