//! Claude CLI provider.

use async_trait::async_trait;
use std::process::Stdio;
use tokio::process::Command;

use super::provider::{Provider, ProviderError, Result};

pub struct ClaudeProvider {
    cli_path: String,
    default_model: Option<String>,
}

impl ClaudeProvider {
    pub fn new() -> Self {
        Self::with_model(None)
    }

    pub fn with_model(model: Option<String>) -> Self {
        Self {
            cli_path: "claude".to_string(),
            default_model: selected_model_arg(model.as_deref()),
        }
    }

    pub fn with_cli_path(mut self, cli_path: impl Into<String>) -> Self {
        self.cli_path = cli_path.into();
        self
    }
}

impl Default for ClaudeProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn selected_model_arg(model: Option<&str>) -> Option<String> {
    model
        .map(str::trim)
        .filter(|m| !m.is_empty() && *m != "default")
        .map(ToString::to_string)
}

#[async_trait]
impl Provider for ClaudeProvider {
    fn name(&self) -> &str {
        "claude"
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.cli_path)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        Ok(vec![
            "sonnet".to_string(),
            "opus".to_string(),
            "haiku".to_string(),
        ])
    }

    /// The CLI has no temperature flag; the argument is ignored.
    async fn complete(&self, prompt: &str, _temperature: f32) -> Result<String> {
        let mut cmd = Command::new(&self.cli_path);
        cmd.arg("-p").arg(prompt);

        if let Some(m) = &self.default_model {
            cmd.arg("--model").arg(m);
        }

        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let output = cmd.output().await?;

        if output.status.success() {
            Ok(String::from_utf8_lossy(&output.stdout).to_string())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(ProviderError::ApiError(stderr.to_string()))
        }
    }

    fn default_model(&self) -> Option<&str> {
        self.default_model.as_deref()
    }
}
