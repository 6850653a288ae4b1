//! Configuration loading for triad.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;
use crate::network::PumpMode;

pub type Result<T> = std::result::Result<T, Error>;

/// Get the triad home directory (~/.triad).
pub fn get_home_dir() -> Result<PathBuf> {
    let home = directories::UserDirs::new()
        .ok_or_else(|| Error::Config("Could not determine home directory".to_string()))?;

    Ok(home.home_dir().join(".triad"))
}

/// Get the settings file path.
pub fn get_settings_path() -> Result<PathBuf> {
    Ok(get_home_dir()?.join("settings.json"))
}

/// Load settings from ~/.triad/settings.json, then apply environment overrides.
pub fn load_settings() -> Result<Settings> {
    let path = get_settings_path()?;
    let mut settings = read_settings_file(&path)?.ok_or_else(|| {
        Error::Config(format!("Settings file not found at {}", path.display()))
    })?;
    apply_env_overrides(&mut settings);
    validate_settings(&settings)?;

    tracing::debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

/// Load settings or return defaults (with environment overrides) if not found.
pub fn load_settings_or_default() -> Settings {
    load_settings().unwrap_or_else(|e| {
        tracing::warn!("Failed to load settings: {}, using defaults", e);
        let mut settings = Settings::default();
        apply_env_overrides(&mut settings);
        settings
    })
}

/// Read the settings file exactly as stored. Environment overrides are not
/// applied, so the result is safe to write back.
fn read_settings_file(path: &Path) -> Result<Option<Settings>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

/// Write settings to `path`, creating the directory if needed.
pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(settings)?)?;
    Ok(())
}

/// Persist a provider switch in ~/.triad/settings.json.
pub fn switch_provider(provider: &str, model: Option<&str>) -> Result<PathBuf> {
    let path = get_settings_path()?;
    switch_provider_at(&path, provider, model)?;
    Ok(path)
}

/// Update the provider (and optionally the model) in the settings file at
/// `path`. Only stored values are written back; `TRIAD_*` and
/// `GEMINI_API_KEY` never reach the disk.
pub fn switch_provider_at(path: &Path, provider: &str, model: Option<&str>) -> Result<Settings> {
    let mut settings = read_settings_file(path)?.unwrap_or_default();
    settings.models.provider = provider.to_string();
    if let Some(m) = model {
        settings.models.model = Some(m.to_string());
    }
    validate_settings(&settings)?;
    save_settings_to(path, &settings)?;
    Ok(settings)
}

fn apply_env_overrides(settings: &mut Settings) {
    if let Ok(provider) = std::env::var("TRIAD_PROVIDER") {
        if !provider.trim().is_empty() {
            settings.models.provider = provider.trim().to_string();
        }
    }
    if let Ok(model) = std::env::var("TRIAD_MODEL") {
        if !model.trim().is_empty() {
            settings.models.model = Some(model.trim().to_string());
        }
    }
    if settings.models.api_key.is_none() {
        if let Ok(key) = std::env::var("GEMINI_API_KEY") {
            if !key.trim().is_empty() {
                settings.models.api_key = Some(key);
            }
        }
    }
}

pub fn validate_settings(settings: &Settings) -> Result<()> {
    if settings.models.provider.trim().is_empty() {
        return Err(Error::Config("models.provider must not be empty".to_string()));
    }
    if !(0.0..=2.0).contains(&settings.models.temperature) {
        return Err(Error::Config(format!(
            "models.temperature {} is outside 0.0..=2.0",
            settings.models.temperature
        )));
    }
    if settings.network.max_idle_rounds == 0 {
        return Err(Error::Config("network.max_idle_rounds must be at least 1".to_string()));
    }
    if settings.network.poll_timeout_ms == 0 || settings.network.collect_poll_ms == 0 {
        return Err(Error::Config(
            "network poll timeouts must be positive; unbounded waits would stall the pump".to_string(),
        ));
    }
    if settings.knowledge.chunk_size == 0 {
        return Err(Error::Config("knowledge.chunk_size must be positive".to_string()));
    }
    if settings.knowledge.chunk_overlap >= settings.knowledge.chunk_size {
        return Err(Error::Config(format!(
            "knowledge.chunk_overlap ({}) must be smaller than chunk_size ({})",
            settings.knowledge.chunk_overlap, settings.knowledge.chunk_size
        )));
    }
    Ok(())
}

/// Reasoning engine configuration.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Models {
    #[serde(default = "default_provider")]
    pub provider: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    #[serde(default)]
    pub temperature: f32,
}

fn default_provider() -> String {
    "ollama".to_string()
}

impl Default for Models {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            base_url: None,
            api_key: None,
            temperature: 0.0,
        }
    }
}

/// Pump loop and collection deadlines.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NetworkSettings {
    /// Hard wall-clock cap on the pump phase.
    #[serde(default = "default_pump_deadline_ms")]
    pub pump_deadline_ms: u64,
    /// Consecutive rounds without progress before the pump gives up.
    #[serde(default = "default_max_idle_rounds")]
    pub max_idle_rounds: u32,
    /// Per-call receive timeout for Worker and Verifier.
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    /// How long the Planner waits for results after pumping.
    #[serde(default = "default_collect_timeout_ms")]
    pub collect_timeout_ms: u64,
    /// Per-call receive timeout while collecting.
    #[serde(default = "default_collect_poll_ms")]
    pub collect_poll_ms: u64,
    /// Join results by task_id instead of arrival order.
    #[serde(default)]
    pub order_results_by_task: bool,
    #[serde(default)]
    pub mode: PumpMode,
}

fn default_pump_deadline_ms() -> u64 {
    10_000
}

fn default_max_idle_rounds() -> u32 {
    10
}

fn default_poll_timeout_ms() -> u64 {
    100
}

fn default_collect_timeout_ms() -> u64 {
    1_000
}

fn default_collect_poll_ms() -> u64 {
    50
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            pump_deadline_ms: default_pump_deadline_ms(),
            max_idle_rounds: default_max_idle_rounds(),
            poll_timeout_ms: default_poll_timeout_ms(),
            collect_timeout_ms: default_collect_timeout_ms(),
            collect_poll_ms: default_collect_poll_ms(),
            order_results_by_task: false,
            mode: PumpMode::default(),
        }
    }
}

impl NetworkSettings {
    pub fn pump_deadline(&self) -> Duration {
        Duration::from_millis(self.pump_deadline_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn collect_timeout(&self) -> Duration {
        Duration::from_millis(self.collect_timeout_ms)
    }

    pub fn collect_poll(&self) -> Duration {
        Duration::from_millis(self.collect_poll_ms)
    }
}

/// Timeout and retry policy for reasoning-engine calls.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ExecutionSettings {
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_retries")]
    pub retries: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_timeout_seconds() -> u64 {
    240
}

fn default_retries() -> u32 {
    1
}

fn default_retry_backoff_ms() -> u64 {
    600
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            retries: default_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

/// Knowledge base used by the Worker's retrieval tool.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct KnowledgeSettings {
    /// Directory of `*.txt` documents. Retrieval is disabled when unset.
    pub docs_dir: Option<PathBuf>,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_knowledge_temperature")]
    pub temperature: f32,
}

fn default_chunk_size() -> usize {
    500
}

fn default_chunk_overlap() -> usize {
    50
}

fn default_top_k() -> usize {
    2
}

fn default_knowledge_temperature() -> f32 {
    0.1
}

impl Default for KnowledgeSettings {
    fn default() -> Self {
        Self {
            docs_dir: None,
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            temperature: default_knowledge_temperature(),
        }
    }
}

/// File tools offered to the Worker.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ToolSettings {
    #[serde(default = "default_tools_enabled")]
    pub enabled: bool,
    /// Relative tool paths resolve against this directory (default: cwd).
    pub root: Option<PathBuf>,
    #[serde(default = "default_max_read_chars")]
    pub max_read_chars: usize,
}

fn default_tools_enabled() -> bool {
    true
}

fn default_max_read_chars() -> usize {
    5000
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            enabled: default_tools_enabled(),
            root: None,
            max_read_chars: default_max_read_chars(),
        }
    }
}

/// triad settings.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct Settings {
    #[serde(default)]
    pub models: Models,

    #[serde(default)]
    pub network: NetworkSettings,

    #[serde(default)]
    pub execution: ExecutionSettings,

    #[serde(default)]
    pub knowledge: KnowledgeSettings,

    #[serde(default)]
    pub tools: ToolSettings,
}
