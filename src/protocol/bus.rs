//! In-process message bus: one FIFO mailbox per registered agent name.
//!
//! The name -> mailbox map is guarded by a single lock that is only held long
//! enough to clone an `Arc<Mailbox>`. Each mailbox has its own queue lock and a
//! [`Notify`] that wakes a blocked receiver on enqueue, so traffic to
//! different recipients never contends on queue state.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::time::Instant;

use super::envelope::Envelope;
use crate::error::{Error, Result};

/// An agent's mailbox.
#[derive(Debug)]
struct Mailbox {
    queue: Mutex<VecDeque<Envelope>>,
    notify: Notify,
    total_received: AtomicU64,
    total_delivered: AtomicU64,
}

impl Mailbox {
    fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            total_received: AtomicU64::new(0),
            total_delivered: AtomicU64::new(0),
        }
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<Envelope>> {
        // A panic while holding the lock cannot leave the VecDeque half-mutated.
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, envelope: Envelope) {
        {
            let mut queue = self.queue();
            queue.push_back(envelope);
            self.total_received.fetch_add(1, Ordering::Relaxed);
        }
        self.notify.notify_one();
    }

    fn pop(&self) -> Option<Envelope> {
        let mut queue = self.queue();
        let envelope = queue.pop_front();
        if envelope.is_some() {
            self.total_delivered.fetch_add(1, Ordering::Relaxed);
        }
        envelope
    }

    /// Counters are only mutated under the queue lock, so this snapshot is
    /// consistent with `pending`.
    fn stats(&self, agent_id: String) -> MailboxStats {
        let queue = self.queue();
        MailboxStats {
            agent_id,
            pending: queue.len(),
            total_received: self.total_received.load(Ordering::Relaxed),
            total_delivered: self.total_delivered.load(Ordering::Relaxed),
        }
    }
}

/// Mailbox statistics.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MailboxStats {
    pub agent_id: String,
    pub pending: usize,
    pub total_received: u64,
    pub total_delivered: u64,
}

/// Shared message bus. Construct one per orchestration session and hand it to
/// every role as `Arc<MessageBus>`.
#[derive(Debug, Default)]
pub struct MessageBus {
    mailboxes: Mutex<HashMap<String, Arc<Mailbox>>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn mailboxes(&self) -> MutexGuard<'_, HashMap<String, Arc<Mailbox>>> {
        self.mailboxes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn mailbox(&self, name: &str) -> Option<Arc<Mailbox>> {
        self.mailboxes().get(name).cloned()
    }

    /// Register a mailbox. Idempotent: an existing mailbox and its queued
    /// messages are left untouched. Returns true if the mailbox was created.
    pub fn register(&self, name: impl Into<String>) -> bool {
        let name = name.into();
        let mut mailboxes = self.mailboxes();
        if mailboxes.contains_key(&name) {
            return false;
        }
        tracing::debug!(agent = %name, "Registered mailbox");
        mailboxes.insert(name, Arc::new(Mailbox::new()));
        true
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.mailboxes().contains_key(name)
    }

    /// Registered agent names, sorted.
    pub fn agents(&self) -> Vec<String> {
        let mut names: Vec<String> = self.mailboxes().keys().cloned().collect();
        names.sort();
        names
    }

    /// Enqueue an envelope on its recipient's mailbox and wake a waiting receiver.
    pub fn send(&self, envelope: Envelope) -> Result<()> {
        let mailbox = self
            .mailbox(envelope.recipient())
            .ok_or_else(|| Error::UnknownRecipient(envelope.recipient().to_string()))?;

        tracing::debug!(
            id = %envelope.id(),
            from = %envelope.sender(),
            to = %envelope.recipient(),
            kind = %envelope.message_type(),
            "Enqueued message"
        );
        mailbox.push(envelope);
        Ok(())
    }

    /// Take the oldest message for `name`, waiting up to `timeout` for one to
    /// arrive. `None` waits without bound. Returns `Ok(None)` on timeout.
    pub async fn receive(&self, name: &str, timeout: Option<Duration>) -> Result<Option<Envelope>> {
        let mailbox = self
            .mailbox(name)
            .ok_or_else(|| Error::UnknownAgent(name.to_string()))?;

        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            if let Some(envelope) = mailbox.pop() {
                return Ok(Some(envelope));
            }

            // notify_one stores a permit when no one is waiting, so a send that
            // lands between the pop above and this await is not lost.
            match deadline {
                Some(deadline) => {
                    if tokio::time::timeout_at(deadline, mailbox.notify.notified())
                        .await
                        .is_err()
                    {
                        return Ok(mailbox.pop());
                    }
                }
                None => mailbox.notify.notified().await,
            }
        }
    }

    /// Take the oldest message for `name` without waiting.
    pub fn try_receive(&self, name: &str) -> Result<Option<Envelope>> {
        let mailbox = self
            .mailbox(name)
            .ok_or_else(|| Error::UnknownAgent(name.to_string()))?;
        Ok(mailbox.pop())
    }

    /// Number of messages waiting for `name`.
    pub fn pending(&self, name: &str) -> Result<usize> {
        let mailbox = self
            .mailbox(name)
            .ok_or_else(|| Error::UnknownAgent(name.to_string()))?;
        let pending = mailbox.queue().len();
        Ok(pending)
    }

    /// Remove and return everything queued for `name`, oldest first.
    pub fn drain(&self, name: &str) -> Result<Vec<Envelope>> {
        let mailbox = self
            .mailbox(name)
            .ok_or_else(|| Error::UnknownAgent(name.to_string()))?;
        let drained: Vec<Envelope> = mailbox.queue().drain(..).collect();
        if !drained.is_empty() {
            tracing::debug!(agent = %name, count = drained.len(), "Drained mailbox");
        }
        Ok(drained)
    }

    /// Statistics for all mailboxes, sorted by agent name.
    pub fn stats(&self) -> Vec<MailboxStats> {
        let snapshot: Vec<(String, Arc<Mailbox>)> = self
            .mailboxes()
            .iter()
            .map(|(name, mailbox)| (name.clone(), Arc::clone(mailbox)))
            .collect();

        let mut stats: Vec<MailboxStats> = snapshot
            .into_iter()
            .map(|(agent_id, mailbox)| mailbox.stats(agent_id))
            .collect();
        stats.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        stats
    }
}
