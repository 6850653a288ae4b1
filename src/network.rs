//! The Planner -> Worker -> Verifier network and its pump loop.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::Instant;

use crate::agent::ExecutionContract;
use crate::config::{NetworkSettings, Settings};
use crate::error::Result;
use crate::knowledge::KnowledgeBase;
use crate::pipeline::Pipeline;
use crate::protocol::{agents, MessageBus};
use crate::providers::Provider;
use crate::roles::{Planner, ResultOrder, Role, Verifier, Worker};
use crate::tools::FileToolCatalog;

/// How Worker and Verifier are driven between dispatch and collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PumpMode {
    /// One control flow alternates Worker and Verifier.
    #[default]
    Cooperative,
    /// Worker and Verifier run on their own tasks while the Planner collects.
    Concurrent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpExit {
    Deadline,
    Idle,
}

/// Outcome of one cooperative pump phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpReport {
    pub rounds: u32,
    pub progressed_rounds: u32,
    pub exit: PumpExit,
}

pub struct Network {
    bus: Arc<MessageBus>,
    planner: Planner,
    worker: Arc<Worker>,
    verifier: Arc<Verifier>,
    settings: NetworkSettings,
    last_pump: Option<PumpReport>,
}

impl Network {
    /// Build the three roles from settings. File tools come from
    /// `settings.tools`; retrieval is enabled when `knowledge.docs_dir` is set.
    pub fn new(provider: Arc<dyn Provider>, settings: &Settings) -> Result<Self> {
        let bus = Arc::new(MessageBus::new());
        let contract = ExecutionContract::from(&settings.execution);
        let temperature = settings.models.temperature;
        let order = if settings.network.order_results_by_task {
            ResultOrder::TaskId
        } else {
            ResultOrder::Arrival
        };

        let planner = Planner::new(bus.clone(), provider.clone())
            .with_contract(contract.clone())
            .with_temperature(temperature)
            .with_collect_poll(settings.network.collect_poll())
            .with_result_order(order);

        let mut worker = Worker::new(bus.clone(), provider.clone())
            .with_catalog(Arc::new(FileToolCatalog::from_settings(&settings.tools)))
            .with_contract(contract.clone())
            .with_temperature(temperature);
        if let Some(kb) = KnowledgeBase::from_settings(&settings.knowledge, provider.clone(), contract.clone())? {
            tracing::info!(chunks = kb.store().len(), "Knowledge base enabled");
            worker = worker.with_retriever(Arc::new(kb));
        }

        let verifier = Verifier::new(bus.clone(), provider)
            .with_contract(contract)
            .with_temperature(temperature);

        Ok(Self::from_parts(bus, planner, worker, verifier, settings.network.clone()))
    }

    /// Assemble a network from roles already registered on `bus`.
    pub fn from_parts(
        bus: Arc<MessageBus>,
        planner: Planner,
        worker: Worker,
        verifier: Verifier,
        settings: NetworkSettings,
    ) -> Self {
        Self {
            bus,
            planner,
            worker: Arc::new(worker),
            verifier: Arc::new(verifier),
            settings,
            last_pump: None,
        }
    }

    pub fn bus(&self) -> &Arc<MessageBus> {
        &self.bus
    }

    pub fn settings(&self) -> &NetworkSettings {
        &self.settings
    }

    pub fn set_mode(&mut self, mode: PumpMode) {
        self.settings.mode = mode;
    }

    /// Report from the most recent cooperative pump, if any.
    pub fn last_pump(&self) -> Option<&PumpReport> {
        self.last_pump.as_ref()
    }

    pub fn pipeline(&self) -> Pipeline<'_> {
        Pipeline::new(&self.planner, &self.worker, &self.verifier)
    }

    /// Sequential orchestration over the same roles, bypassing the bus.
    pub async fn run_pipeline(&self, input: &str) -> String {
        self.pipeline().run(input).await
    }

    /// Discard everything queued for the three roles.
    pub fn reset(&self) -> Result<usize> {
        let mut dropped = 0;
        for name in [agents::PLANNER, agents::WORKER, agents::VERIFIER] {
            dropped += self.bus.drain(name)?.len();
        }
        if dropped > 0 {
            tracing::info!(dropped, "Discarded stale messages before run");
        }
        Ok(dropped)
    }

    /// Handle one user request end to end. Timeouts and role failures show
    /// up in the returned text; only protocol errors are returned as `Err`.
    pub async fn run(&mut self, input: &str) -> Result<String> {
        self.reset()?;
        let dispatched = self.planner.process_user_request(input).await?;
        tracing::info!(dispatched, mode = ?self.settings.mode, "Request dispatched");

        let answer = match self.settings.mode {
            PumpMode::Cooperative => {
                let report = self.pump().await?;
                tracing::debug!(?report, "Pump finished");
                self.last_pump = Some(report);
                self.planner.collect_results(self.settings.collect_timeout()).await?
            }
            PumpMode::Concurrent => {
                self.last_pump = None;
                self.run_concurrent().await?
            }
        };

        tracing::info!(
            received = self.planner.results().len(),
            expected = self.planner.expected_results(),
            "Run complete"
        );
        Ok(answer)
    }

    /// Alternate Worker and Verifier until the wall-clock cap or the idle cap.
    pub async fn pump(&self) -> Result<PumpReport> {
        let deadline = Instant::now() + self.settings.pump_deadline();
        let poll = self.settings.poll_timeout();
        let mut idle_rounds = 0;
        let mut report = PumpReport {
            rounds: 0,
            progressed_rounds: 0,
            exit: PumpExit::Deadline,
        };

        loop {
            if Instant::now() >= deadline {
                report.exit = PumpExit::Deadline;
                break;
            }
            if idle_rounds >= self.settings.max_idle_rounds {
                report.exit = PumpExit::Idle;
                break;
            }

            report.rounds += 1;
            let mut progressed = step(self.worker.as_ref(), deadline, poll).await?;
            if Instant::now() < deadline {
                progressed |= step(self.verifier.as_ref(), deadline, poll).await?;
            }

            if progressed {
                report.progressed_rounds += 1;
                idle_rounds = 0;
            } else {
                idle_rounds += 1;
            }
        }

        Ok(report)
    }

    async fn run_concurrent(&mut self) -> Result<String> {
        let pump_deadline = self.settings.pump_deadline();
        let deadline = Instant::now() + pump_deadline;
        let poll = self.settings.poll_timeout();
        let (stop_tx, stop_rx) = watch::channel(false);

        let worker: Arc<dyn Role> = self.worker.clone();
        let verifier: Arc<dyn Role> = self.verifier.clone();
        let handles = [
            tokio::spawn(drive(worker, deadline, poll, stop_rx.clone())),
            tokio::spawn(drive(verifier, deadline, poll, stop_rx)),
        ];

        let collected = self
            .planner
            .collect_results(pump_deadline + self.settings.collect_timeout())
            .await;
        let _ = stop_tx.send(true);

        for handle in handles {
            match handle.await {
                Ok(Ok(handled)) => tracing::debug!(handled, "Role loop stopped"),
                Ok(Err(e)) => return Err(e),
                Err(e) => tracing::warn!("Role loop panicked: {}", e),
            }
        }

        collected
    }
}

/// One `process_once` bounded by the pump deadline. A call still running at
/// the deadline is dropped; its message stays consumed.
async fn step(role: &dyn Role, deadline: Instant, poll: Duration) -> Result<bool> {
    match tokio::time::timeout_at(deadline, role.process_once(poll)).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(role = role.name(), "Abandoned in-flight work at pump deadline");
            Ok(false)
        }
    }
}

/// Drive `role` until the deadline or a stop signal. Returns messages handled.
async fn drive(
    role: Arc<dyn Role>,
    deadline: Instant,
    poll: Duration,
    mut stop: watch::Receiver<bool>,
) -> Result<u64> {
    let mut handled = 0;
    loop {
        if *stop.borrow() || Instant::now() >= deadline {
            break;
        }
        tokio::select! {
            _ = stop.changed() => break,
            progressed = step(role.as_ref(), deadline, poll) => {
                if progressed? {
                    handled += 1;
                }
            }
        }
    }
    Ok(handled)
}
