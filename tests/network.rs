//! End-to-end behavior of the Planner -> Worker -> Verifier network with a
//! mocked reasoning engine.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use triad::agent::ExecutionContract;
use triad::config::NetworkSettings;
use triad::protocol::{agents, meta, EnvelopeBuilder, MessageBus, MessageType};
use triad::providers::{self, Provider};
use triad::roles::{Planner, ResultOrder, Role, Verifier, Worker};
use triad::tools::{StaticCatalog, Tool};
use triad::{Network, PumpMode};

type WorkerReply = Box<dyn Fn(&str) -> String + Send + Sync>;

/// Answers by prompt kind: a fixed plan for decomposition, `worker` for the
/// reasoning loop, and an echo for verification.
struct MockEngine {
    plan: String,
    worker: WorkerReply,
    worker_delay: Duration,
}

impl MockEngine {
    fn new(plan: &str) -> Self {
        Self {
            plan: plan.to_string(),
            worker: Box::new(|question| format!("Final Answer: {}", question)),
            worker_delay: Duration::ZERO,
        }
    }

    fn worker(mut self, reply: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.worker = Box::new(reply);
        self
    }

    fn worker_delay(mut self, delay: Duration) -> Self {
        self.worker_delay = delay;
        self
    }
}

fn question(prompt: &str) -> Option<&str> {
    let start = prompt.find("\nQuestion: ")? + "\nQuestion: ".len();
    let rest = &prompt[start..];
    Some(rest.split('\n').next().unwrap_or(rest))
}

#[async_trait]
impl Provider for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, prompt: &str, _temperature: f32) -> providers::Result<String> {
        if prompt.contains("Break the user's objective") {
            return Ok(self.plan.clone());
        }
        if prompt.starts_with("Clean up and verify") {
            let text = prompt.split_once("\n\n").map(|(_, t)| t).unwrap_or("");
            return Ok(text.to_string());
        }
        let q = question(prompt).unwrap_or_default().to_string();
        if !self.worker_delay.is_zero() {
            tokio::time::sleep(self.worker_delay).await;
        }
        Ok((self.worker)(&q))
    }
}

struct FlakyTool;

#[async_trait]
impl Tool for FlakyTool {
    fn name(&self) -> &str {
        "flaky"
    }

    fn description(&self) -> &str {
        "Fails every time."
    }

    async fn call(&self, _input: &str) -> triad::Result<String> {
        Err(triad::Error::Tool("flaky tool exploded".to_string()))
    }
}

fn fast() -> NetworkSettings {
    NetworkSettings {
        pump_deadline_ms: 3_000,
        max_idle_rounds: 5,
        poll_timeout_ms: 20,
        collect_timeout_ms: 300,
        collect_poll_ms: 10,
        ..NetworkSettings::default()
    }
}

struct Roles {
    bus: Arc<MessageBus>,
    planner: Planner,
    worker: Worker,
    verifier: Verifier,
}

fn roles(engine: MockEngine) -> Roles {
    let provider: Arc<dyn Provider> = Arc::new(engine);
    let contract = ExecutionContract::once(Duration::from_secs(5));
    let bus = Arc::new(MessageBus::new());
    Roles {
        planner: Planner::new(bus.clone(), provider.clone()).with_contract(contract.clone()),
        worker: Worker::new(bus.clone(), provider.clone()).with_contract(contract.clone()),
        verifier: Verifier::new(bus.clone(), provider).with_contract(contract),
        bus,
    }
}

fn network(engine: MockEngine, settings: NetworkSettings) -> Network {
    let r = roles(engine);
    Network::from_parts(r.bus, r.planner, r.worker, r.verifier, settings)
}

#[tokio::test]
async fn single_subtask_passes_through_unchanged() {
    let mut net = network(MockEngine::new(r#"{"subtasks": ["Summarize document X"]}"#), fast());
    let answer = net.run("Summarize document X").await.unwrap();
    assert_eq!(answer, "Summarize document X");
}

#[tokio::test]
async fn two_subtasks_are_joined_by_blank_line() {
    let engine = MockEngine::new(r#"{"subtasks": ["A", "B"]}"#).worker(|q| format!("Final Answer: {} done", q));
    let mut net = network(engine, fast());

    let answer = net.run("do A then B").await.unwrap();
    let parts: Vec<&str> = answer.split("\n\n").collect();
    assert_eq!(parts.len(), 2);
    assert!(parts.contains(&"A done"));
    assert!(parts.contains(&"B done"));
}

#[tokio::test]
async fn concurrent_mode_matches_cooperative_output() {
    let mut settings = fast();
    settings.mode = PumpMode::Concurrent;
    let mut net = network(MockEngine::new(r#"{"subtasks": ["A", "B"]}"#), settings);

    let answer = net.run("both").await.unwrap();
    let mut parts: Vec<&str> = answer.split("\n\n").collect();
    parts.sort();
    assert_eq!(parts, vec!["A", "B"]);
}

#[tokio::test]
async fn pump_cap_shorter_than_work_yields_empty_answer() {
    let engine = MockEngine::new(r#"{"subtasks": ["slow"]}"#).worker_delay(Duration::from_millis(600));
    let settings = NetworkSettings {
        pump_deadline_ms: 100,
        collect_timeout_ms: 100,
        ..fast()
    };
    let mut net = network(engine, settings);

    let started = std::time::Instant::now();
    let answer = net.run("anything").await.unwrap();
    assert_eq!(answer, "");
    assert!(started.elapsed() < Duration::from_millis(600));
}

#[tokio::test]
async fn tool_failure_becomes_text_and_still_reaches_planner() {
    let engine = MockEngine::new(r#"{"subtasks": ["use the flaky tool"]}"#)
        .worker(|_| "Action: flaky\nAction Input: go".to_string());
    let r = roles(engine);
    let worker = r
        .worker
        .with_catalog(Arc::new(StaticCatalog::new(vec![Arc::new(FlakyTool)])));
    let mut net = Network::from_parts(r.bus, r.planner, worker, r.verifier, fast());

    let answer = net.run("try it").await.unwrap();
    assert!(answer.starts_with("Worker error: "), "got {:?}", answer);
    assert!(answer.contains("flaky tool exploded"));
}

#[tokio::test]
async fn malformed_decomposition_dispatches_the_request_itself() {
    let mut r = roles(MockEngine::new("Here is my plan: first, think hard. {not json"));

    let dispatched = r.planner.process_user_request("the original request").await.unwrap();
    assert_eq!(dispatched, 1);
    assert_eq!(r.bus.pending(agents::WORKER).unwrap(), 1);

    let request = r.bus.try_receive(agents::WORKER).unwrap().unwrap();
    assert_eq!(request.message_type(), MessageType::TaskRequest);
    assert_eq!(request.payload(), "the original request");
    assert_eq!(request.task_id(), Some(1));
}

#[tokio::test]
async fn task_ids_trace_back_to_their_subtasks() {
    let mut r = roles(MockEngine::new(r#"{"subtasks": ["one", "two", "three"]}"#));
    r.planner = r.planner.with_result_order(ResultOrder::TaskId);
    r.planner.process_user_request("count").await.unwrap();

    let poll = Duration::from_millis(20);
    while r.worker.process_once(poll).await.unwrap() {}
    while r.verifier.process_once(poll).await.unwrap() {}

    let answer = r.planner.collect_results(Duration::from_secs(1)).await.unwrap();
    assert_eq!(answer, "one\n\ntwo\n\nthree");

    let traced: Vec<(Option<u64>, &str)> = r
        .planner
        .results()
        .iter()
        .map(|res| (res.task_id, res.payload.as_str()))
        .collect();
    assert_eq!(
        traced,
        vec![(Some(1), "one"), (Some(2), "two"), (Some(3), "three")]
    );
}

#[tokio::test]
async fn results_from_an_earlier_session_are_ignored() {
    let mut net = network(MockEngine::new(r#"{"subtasks": ["fresh"]}"#), fast());
    assert_eq!(net.run("first").await.unwrap(), "fresh");

    // A straggler from an old request lands between runs.
    let stale = EnvelopeBuilder::from(agents::VERIFIER)
        .to(agents::PLANNER)
        .message_type(MessageType::TaskResult)
        .payload("stale")
        .meta(meta::FROM_TASK_ID, 1u64)
        .meta(meta::SESSION_ID, "old-session")
        .build()
        .unwrap();
    net.bus().send(stale).unwrap();

    assert_eq!(net.run("second").await.unwrap(), "fresh");
}

#[tokio::test]
async fn independent_networks_do_not_cross_talk() {
    let mut left = network(MockEngine::new(r#"{"subtasks": ["left"]}"#), fast());
    let mut right = network(MockEngine::new(r#"{"subtasks": ["right"]}"#), fast());

    let (a, b) = tokio::join!(left.run("l"), right.run("r"));
    assert_eq!(a.unwrap(), "left");
    assert_eq!(b.unwrap(), "right");
}

#[tokio::test]
async fn pipeline_labels_subtasks_before_verifying() {
    let engine = MockEngine::new(r#"{"subtasks": ["A", "B"]}"#);
    let net = network(engine, fast());
    let answer = net.run_pipeline("both").await;
    // The bundle verifier uses the reasoning loop; the mock echoes its question line.
    assert_eq!(answer, "[Subtask 1] A");
}
