//! Reasoning-engine provider trait for triad.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not available: {0}")]
    NotAvailable(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Timeout")]
    Timeout,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ProviderError>;

/// A text-completion capability: given a prompt, return text.
///
/// Calls may fail, may return malformed output, and have unbounded latency.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name.
    fn name(&self) -> &str;

    /// Check if the provider is reachable (CLI installed or API configured).
    async fn is_available(&self) -> bool {
        true
    }

    /// List available models.
    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(self.default_model().map(|m| vec![m.to_string()]).unwrap_or_default())
    }

    /// Complete a prompt.
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String>;

    /// The model this provider sends requests to.
    fn default_model(&self) -> Option<&str> {
        None
    }
}

impl ProviderError {
    pub fn other(s: impl Into<String>) -> Self {
        ProviderError::Other(s.into())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted providers shared by unit tests.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Returns queued replies in order; repeats the last one when exhausted.
    pub struct ScriptedProvider {
        replies: Mutex<VecDeque<Result<String>>>,
        last: Mutex<Option<String>>,
        pub prompts: Mutex<Vec<String>>,
        delay: Duration,
    }

    impl ScriptedProvider {
        pub fn new<I, S>(replies: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Self {
                replies: Mutex::new(replies.into_iter().map(|s| Ok(s.into())).collect()),
                last: Mutex::new(None),
                prompts: Mutex::new(Vec::new()),
                delay: Duration::ZERO,
            }
        }

        pub fn failing(message: &str) -> Self {
            Self::new(Vec::<String>::new()).then_err(message)
        }

        pub fn then_ok(self, text: &str) -> Self {
            self.replies.lock().unwrap().push_back(Ok(text.to_string()));
            self
        }

        pub fn then_err(self, message: &str) -> Self {
            self.replies
                .lock()
                .unwrap()
                .push_back(Err(ProviderError::ApiError(message.to_string())));
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, prompt: &str, _temperature: f32) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let next = self.replies.lock().unwrap().pop_front();
            match next {
                Some(Ok(text)) => {
                    *self.last.lock().unwrap() = Some(text.clone());
                    Ok(text)
                }
                Some(Err(e)) => Err(e),
                None => match self.last.lock().unwrap().clone() {
                    Some(text) => Ok(text),
                    None => Err(ProviderError::ApiError("script exhausted".to_string())),
                },
            }
        }
    }

    /// Echoes the last paragraph of the prompt back.
    pub struct EchoProvider;

    #[async_trait]
    impl Provider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn complete(&self, prompt: &str, _temperature: f32) -> Result<String> {
            Ok(prompt.rsplit("\n\n").next().unwrap_or(prompt).trim().to_string())
        }
    }
}
