//! The three bus roles and the reasoning loop they share.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::protocol::{Envelope, MessageBus, MessageType};

pub mod planner;
pub mod prompts;
pub mod tool_agent;
pub mod verifier;
pub mod worker;

pub use planner::{parse_subtasks, Planner, ResultOrder, TaskResult};
pub use tool_agent::ToolAgent;
pub use verifier::Verifier;
pub use worker::Worker;

/// A bus participant driven by the pump loop.
#[async_trait]
pub trait Role: Send + Sync {
    fn name(&self) -> &str;

    /// Handle at most one message, waiting up to `timeout` for it. Returns
    /// true if a message was consumed. Only protocol errors are returned.
    async fn process_once(&self, timeout: Duration) -> Result<bool>;
}

/// Report a message of the wrong type back to its sender. Dropped silently
/// when the sender has no mailbox.
pub(crate) fn reject(bus: &MessageBus, me: &str, envelope: &Envelope) -> Result<()> {
    tracing::warn!(
        agent = me,
        from = envelope.sender(),
        kind = %envelope.message_type(),
        "Unexpected message type"
    );
    if !bus.is_registered(envelope.sender()) {
        return Ok(());
    }

    let reply = envelope
        .reply(me, MessageType::Error)
        .payload(format!(
            "{} does not handle {} messages",
            me,
            envelope.message_type()
        ))
        .meta_opt(crate::protocol::meta::TASK_ID, envelope.task_id())
        .build()
        .map_err(|e| crate::error::Error::Other(e.to_string()))?;
    bus.send(reply)
}
