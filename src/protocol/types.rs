//! Message types for the agent communication protocol.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Message type classification. The set is closed: roles only ever exchange these four.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    /// Planner -> Worker: one subtask to perform
    TaskRequest,
    /// Worker -> Verifier: raw result for one subtask
    TaskResponse,
    /// Verifier -> Planner: verified result for one subtask
    TaskResult,
    /// Error report
    Error,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageType::TaskRequest => write!(f, "TASK_REQUEST"),
            MessageType::TaskResponse => write!(f, "TASK_RESPONSE"),
            MessageType::TaskResult => write!(f, "TASK_RESULT"),
            MessageType::Error => write!(f, "ERROR"),
        }
    }
}

/// Correlation data attached to an envelope. Opaque to the bus.
pub type Metadata = HashMap<String, serde_json::Value>;

/// Well-known metadata keys.
pub mod meta {
    /// 1-based index of the subtask within its request.
    pub const TASK_ID: &str = "task_id";
    /// Number of subtasks dispatched for the request.
    pub const TOTAL: &str = "total";
    /// The user request the subtask was derived from.
    pub const ORIGINAL_REQUEST: &str = "original_request";
    /// Set by the Verifier: the task_id of the response it verified.
    pub const FROM_TASK_ID: &str = "from_task_id";
    /// Request-scoped tag used to discard stale results.
    pub const SESSION_ID: &str = "session_id";
}

/// Canonical agent names on the bus.
pub mod agents {
    pub const PLANNER: &str = "Planner";
    pub const WORKER: &str = "Worker";
    pub const VERIFIER: &str = "Verifier";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_wire_names() {
        let json = serde_json::to_string(&MessageType::TaskRequest).unwrap();
        assert_eq!(json, "\"TASK_REQUEST\"");

        let parsed: MessageType = serde_json::from_str("\"TASK_RESULT\"").unwrap();
        assert_eq!(parsed, MessageType::TaskResult);
    }

    #[test]
    fn test_display_matches_wire_name() {
        for ty in [
            MessageType::TaskRequest,
            MessageType::TaskResponse,
            MessageType::TaskResult,
            MessageType::Error,
        ] {
            let wire = serde_json::to_string(&ty).unwrap();
            assert_eq!(wire.trim_matches('"'), ty.to_string());
        }
    }
}
