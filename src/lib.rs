//! triad library root.

pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod knowledge;
pub mod logging;
pub mod network;
pub mod pipeline;
pub mod protocol;
pub mod providers;
pub mod roles;
pub mod tools;

pub use cli::Commands;
pub use config::{load_settings, Settings};
pub use error::{Error, Result};
pub use network::{Network, PumpMode};
pub use protocol::{Envelope, MessageBus, MessageType};
pub use providers::Provider;
