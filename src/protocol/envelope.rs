//! Message envelopes carried by the bus.

use serde::{Deserialize, Serialize};

use super::types::{meta, MessageType, Metadata};

/// Immutable message envelope. Fields are read through accessors; build with
/// [`Envelope::new`] or [`EnvelopeBuilder`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    id: String,
    sender: String,
    recipient: String,
    message_type: MessageType,
    payload: String,
    metadata: Metadata,
    /// Creation timestamp (unix ms). Informational only, never used for ordering.
    created_at: i64,
}

impl Envelope {
    /// Create an envelope with no metadata.
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        message_type: MessageType,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            id: generate_id(),
            sender: sender.into(),
            recipient: recipient.into(),
            message_type,
            payload: payload.into(),
            metadata: Metadata::new(),
            created_at: current_timestamp(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Raw metadata lookup.
    pub fn meta(&self, key: &str) -> Option<&serde_json::Value> {
        self.metadata.get(key)
    }

    /// Metadata value as an unsigned integer, if present and numeric.
    pub fn meta_u64(&self, key: &str) -> Option<u64> {
        self.metadata.get(key).and_then(|v| v.as_u64())
    }

    /// Metadata value as a string, if present and a string.
    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }

    pub fn task_id(&self) -> Option<u64> {
        self.meta_u64(meta::TASK_ID)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.meta_str(meta::SESSION_ID)
    }

    /// Start building a reply addressed back to this envelope's sender.
    pub fn reply(&self, from: impl Into<String>, message_type: MessageType) -> EnvelopeBuilder {
        let mut builder = EnvelopeBuilder::from(from)
            .to(self.sender.clone())
            .message_type(message_type);
        if let Some(session) = self.session_id() {
            builder = builder.meta(meta::SESSION_ID, session);
        }
        builder
    }
}

/// Builder for creating envelopes with fluent API.
pub struct EnvelopeBuilder {
    sender: String,
    recipient: Option<String>,
    message_type: Option<MessageType>,
    payload: String,
    metadata: Metadata,
}

impl EnvelopeBuilder {
    /// Start building an envelope from an agent.
    pub fn from(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            recipient: None,
            message_type: None,
            payload: String::new(),
            metadata: Metadata::new(),
        }
    }

    /// Address to a single agent.
    pub fn to(mut self, recipient: impl Into<String>) -> Self {
        self.recipient = Some(recipient.into());
        self
    }

    pub fn message_type(mut self, message_type: MessageType) -> Self {
        self.message_type = Some(message_type);
        self
    }

    pub fn payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Attach one metadata entry. Later calls with the same key win.
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Attach an entry only when a value is present.
    pub fn meta_opt<V: Into<serde_json::Value>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.meta(key, v),
            None => self,
        }
    }

    /// Build the envelope.
    pub fn build(self) -> Result<Envelope, &'static str> {
        let recipient = self.recipient.ok_or("Recipient is required")?;
        let message_type = self.message_type.ok_or("Message type is required")?;

        Ok(Envelope {
            id: generate_id(),
            sender: self.sender,
            recipient,
            message_type,
            payload: self.payload,
            metadata: self.metadata,
            created_at: current_timestamp(),
        })
    }
}

fn generate_id() -> String {
    ulid::Ulid::new().to_string()
}

fn current_timestamp() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
