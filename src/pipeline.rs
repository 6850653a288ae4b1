//! Sequential orchestration without the bus: plan, work each subtask in
//! order, verify the bundle once.

use crate::roles::{Planner, Verifier, Worker};

pub struct Pipeline<'a> {
    planner: &'a Planner,
    worker: &'a Worker,
    verifier: &'a Verifier,
}

impl<'a> Pipeline<'a> {
    pub fn new(planner: &'a Planner, worker: &'a Worker, verifier: &'a Verifier) -> Self {
        Self {
            planner,
            worker,
            verifier,
        }
    }

    /// Worker outputs labelled `[Subtask i] <task>` and joined by blank lines.
    pub async fn work(&self, subtasks: &[String]) -> String {
        let mut outputs = Vec::with_capacity(subtasks.len());
        for (idx, task) in subtasks.iter().enumerate() {
            tracing::info!(step = idx + 1, total = subtasks.len(), "Pipeline subtask");
            let result = self.worker.perform_task(task).await;
            outputs.push(format!("[Subtask {}] {}\n{}", idx + 1, task, result));
        }
        outputs.join("\n\n")
    }

    pub async fn run(&self, request: &str) -> String {
        let subtasks = self.planner.create_subtasks(request).await;
        let bundle = self.work(&subtasks).await;
        self.verifier.verify_bundle(&bundle).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ExecutionContract;
    use crate::protocol::MessageBus;
    use crate::providers::provider::testing::ScriptedProvider;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn bundles_each_subtask_then_verifies_once() {
        let provider = Arc::new(
            ScriptedProvider::new([r#"{"subtasks": ["alpha", "beta"]}"#])
                .then_ok("Final Answer: A")
                .then_ok("Final Answer: B")
                .then_ok("Final Answer: all good"),
        );
        let contract = ExecutionContract::once(Duration::from_secs(1));
        let bus = Arc::new(MessageBus::new());
        let planner = Planner::new(bus.clone(), provider.clone()).with_contract(contract.clone());
        let worker = Worker::new(bus.clone(), provider.clone()).with_contract(contract.clone());
        let verifier = Verifier::new(bus.clone(), provider.clone()).with_contract(contract);

        let answer = Pipeline::new(&planner, &worker, &verifier).run("do both").await;
        assert_eq!(answer, "all good");

        let prompts = provider.prompts();
        assert_eq!(prompts.len(), 4);
        assert!(prompts[3].contains("[Subtask 1] alpha\nA\n\n[Subtask 2] beta\nB"));
        // Nothing went over the bus.
        assert!(bus.stats().iter().all(|s| s.total_received == 0));
    }
}
