//! Agent execution contracts: timeout, retries, and failure codes.

use std::time::Duration;

use crate::config::ExecutionSettings;
use crate::providers::Provider;

#[derive(Debug, Clone)]
pub struct ExecutionContract {
    pub timeout: Duration,
    pub retries: u32,
    pub retry_backoff: Duration,
}

impl Default for ExecutionContract {
    fn default() -> Self {
        Self::from(&ExecutionSettings::default())
    }
}

impl From<&ExecutionSettings> for ExecutionContract {
    fn from(settings: &ExecutionSettings) -> Self {
        Self {
            timeout: Duration::from_secs(settings.timeout_seconds),
            retries: settings.retries,
            retry_backoff: Duration::from_millis(settings.retry_backoff_ms),
        }
    }
}

impl ExecutionContract {
    /// Single attempt, no backoff.
    pub fn once(timeout: Duration) -> Self {
        Self {
            timeout,
            retries: 0,
            retry_backoff: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCode {
    Timeout,
    Unauthorized,
    ProviderUnavailable,
    CliMissing,
    Unknown,
}

impl std::fmt::Display for FailureCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureCode::Timeout => write!(f, "timeout"),
            FailureCode::Unauthorized => write!(f, "unauthorized"),
            FailureCode::ProviderUnavailable => write!(f, "provider_unavailable"),
            FailureCode::CliMissing => write!(f, "cli_missing"),
            FailureCode::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionError {
    pub code: FailureCode,
    pub message: String,
}

impl std::fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ExecutionError {}

/// Run one completion under the contract's timeout and retry policy.
pub async fn execute_with_contract(
    provider: &dyn Provider,
    prompt: &str,
    temperature: f32,
    contract: &ExecutionContract,
) -> Result<String, ExecutionError> {
    let attempts = contract.retries + 1;
    let mut last_error: Option<ExecutionError> = None;

    for attempt in 1..=attempts {
        let result = tokio::time::timeout(contract.timeout, provider.complete(prompt, temperature)).await;
        match result {
            Ok(Ok(text)) => return Ok(text),
            Ok(Err(e)) => {
                let err = classify_error(&e.to_string());
                tracing::warn!(
                    provider = provider.name(),
                    "Execution attempt {}/{} failed: {}",
                    attempt,
                    attempts,
                    err
                );
                last_error = Some(err);
            }
            Err(_) => {
                let err = ExecutionError {
                    code: FailureCode::Timeout,
                    message: format!(
                        "provider completion exceeded timeout of {:?}",
                        contract.timeout
                    ),
                };
                tracing::warn!(
                    provider = provider.name(),
                    "Execution attempt {}/{} timed out",
                    attempt,
                    attempts
                );
                last_error = Some(err);
            }
        }

        if attempt < attempts && !contract.retry_backoff.is_zero() {
            tokio::time::sleep(contract.retry_backoff).await;
        }
    }

    Err(last_error.unwrap_or(ExecutionError {
        code: FailureCode::Unknown,
        message: "execution failed for unknown reason".to_string(),
    }))
}

fn classify_error(message: &str) -> ExecutionError {
    let m = message.to_lowercase();
    let code = if m.contains("unauthorized")
        || m.contains("auth")
        || m.contains("api key")
        || m.contains("forbidden")
    {
        FailureCode::Unauthorized
    } else if m.contains("no such file") || m.contains("command not found") {
        FailureCode::CliMissing
    } else if m.contains("not available")
        || m.contains("connection")
        || m.contains("timeout")
        || m.contains("failed to connect")
    {
        FailureCode::ProviderUnavailable
    } else {
        FailureCode::Unknown
    };

    ExecutionError {
        code,
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::provider::testing::ScriptedProvider;

    fn quick(retries: u32) -> ExecutionContract {
        ExecutionContract {
            timeout: Duration::from_secs(1),
            retries,
            retry_backoff: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn returns_first_success() {
        let provider = ScriptedProvider::new(["hello"]);
        let text = execute_with_contract(&provider, "p", 0.0, &quick(0)).await.unwrap();
        assert_eq!(text, "hello");
    }

    #[tokio::test]
    async fn retries_after_failure() {
        let provider = ScriptedProvider::failing("connection refused").then_ok("second try");

        let text = execute_with_contract(&provider, "p", 0.0, &quick(1)).await.unwrap();
        assert_eq!(text, "second try");
        assert_eq!(provider.prompts().len(), 2);
    }

    #[tokio::test]
    async fn exhausted_retries_report_last_error() {
        let provider = ScriptedProvider::failing("401 Unauthorized");
        let err = execute_with_contract(&provider, "p", 0.0, &quick(0)).await.unwrap_err();
        assert_eq!(err.code, FailureCode::Unauthorized);
        assert!(err.to_string().starts_with("[unauthorized]"));
    }

    #[tokio::test]
    async fn slow_provider_times_out() {
        let provider = ScriptedProvider::new(["late"]).with_delay(Duration::from_millis(200));
        let contract = ExecutionContract::once(Duration::from_millis(20));
        let err = execute_with_contract(&provider, "p", 0.0, &contract).await.unwrap_err();
        assert_eq!(err.code, FailureCode::Timeout);
    }

    #[test]
    fn classification() {
        assert_eq!(classify_error("command not found: claude").code, FailureCode::CliMissing);
        assert_eq!(classify_error("failed to connect").code, FailureCode::ProviderUnavailable);
        assert_eq!(classify_error("weird").code, FailureCode::Unknown);
    }
}
