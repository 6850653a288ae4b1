//! Agent communication protocol for triad.
//!
//! - Typed message envelopes with correlation metadata
//! - An in-process bus with one FIFO mailbox per registered agent

pub mod bus;
pub mod envelope;
pub mod types;

pub use bus::{MailboxStats, MessageBus};
pub use envelope::{Envelope, EnvelopeBuilder};
pub use types::{agents, meta, MessageType, Metadata};
