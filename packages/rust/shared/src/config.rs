//! Application configuration for pagewise.
//!
//! User config lives at `~/.pagewise/pagewise.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{PagewiseError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "pagewise.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".pagewise";

// ---------------------------------------------------------------------------
// Config structs (matching pagewise.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Text-structuring defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Inference backend bridge.
    #[serde(default)]
    pub backend: BackendConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Maximum QA context length, in characters.
    #[serde(default = "default_context_budget")]
    pub context_budget: usize,

    /// Maximum input length per summarization call, in characters.
    #[serde(default = "default_summary_input_chars")]
    pub summary_input_chars: usize,

    /// Cap on the extractive fallback summary, in characters.
    #[serde(default = "default_fallback_summary_chars")]
    pub fallback_summary_chars: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            context_budget: default_context_budget(),
            summary_input_chars: default_summary_input_chars(),
            fallback_summary_chars: default_fallback_summary_chars(),
        }
    }
}

fn default_context_budget() -> usize {
    4_000
}
fn default_summary_input_chars() -> usize {
    1_024
}
fn default_fallback_summary_chars() -> usize {
    300
}

/// `[backend]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Whether to start the inference bridge at all.
    #[serde(default)]
    pub enabled: bool,

    /// Interpreter or executable used to run the bridge.
    #[serde(default = "default_command")]
    pub command: String,

    /// Bridge script passed to `command`, relative to `working_dir`.
    ///
    /// The default is the JSON-lines bridge shipped in the repository's
    /// `bridge/` directory, so run from the repository root or point this at
    /// an absolute path.
    #[serde(default = "default_script")]
    pub script: String,

    /// Working directory for the bridge subprocess.
    #[serde(default = "default_working_dir")]
    pub working_dir: String,

    /// Per-call timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Time allowed for the bridge to load its models and report ready.
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    /// Upper bound on generated summary length (model tokens).
    #[serde(default = "default_summary_max_length")]
    pub summary_max_length: u32,

    /// Lower bound on generated summary length (model tokens).
    #[serde(default = "default_summary_min_length")]
    pub summary_min_length: u32,

    /// Upper bound on extracted answer length (model tokens).
    #[serde(default = "default_max_answer_length")]
    pub max_answer_length: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            command: default_command(),
            script: default_script(),
            working_dir: default_working_dir(),
            timeout_secs: default_timeout_secs(),
            startup_timeout_secs: default_startup_timeout_secs(),
            summary_max_length: default_summary_max_length(),
            summary_min_length: default_summary_min_length(),
            max_answer_length: default_max_answer_length(),
        }
    }
}

fn default_command() -> String {
    "python3".into()
}
fn default_script() -> String {
    "bridge/inference.py".into()
}
fn default_working_dir() -> String {
    ".".into()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_startup_timeout_secs() -> u64 {
    120
}
fn default_summary_max_length() -> u32 {
    150
}
fn default_summary_min_length() -> u32 {
    50
}
fn default_max_answer_length() -> u32 {
    200
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.pagewise/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| PagewiseError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.pagewise/pagewise.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| PagewiseError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        PagewiseError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| PagewiseError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| PagewiseError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| PagewiseError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Reject values the pipeline cannot work with.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    if config.defaults.context_budget == 0 {
        return Err(PagewiseError::config("defaults.context_budget must be > 0"));
    }
    if config.defaults.summary_input_chars == 0 {
        return Err(PagewiseError::config(
            "defaults.summary_input_chars must be > 0",
        ));
    }
    if config.backend.timeout_secs == 0 {
        return Err(PagewiseError::config("backend.timeout_secs must be > 0"));
    }
    if config.backend.startup_timeout_secs == 0 {
        return Err(PagewiseError::config(
            "backend.startup_timeout_secs must be > 0",
        ));
    }
    if config.backend.summary_min_length > config.backend.summary_max_length {
        return Err(PagewiseError::config(format!(
            "backend.summary_min_length ({}) exceeds summary_max_length ({})",
            config.backend.summary_min_length, config.backend.summary_max_length
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("context_budget"));
        assert!(toml_str.contains("bridge/inference.py"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.context_budget, 4_000);
        assert_eq!(parsed.defaults.summary_input_chars, 1_024);
        assert_eq!(parsed.backend.timeout_secs, 30);
        assert_eq!(parsed.backend.startup_timeout_secs, 120);
        assert!(!parsed.backend.enabled);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[backend]
enabled = true
script = "/opt/models/serve.py"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert!(config.backend.enabled);
        assert_eq!(config.backend.script, "/opt/models/serve.py");
        assert_eq!(config.backend.command, "python3");
        assert_eq!(config.defaults.fallback_summary_chars, 300);
    }

    #[test]
    fn validation_rejects_zero_budget() {
        let mut config = AppConfig::default();
        config.defaults.context_budget = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("context_budget"));
    }

    #[test]
    fn validation_rejects_zero_startup_timeout() {
        let mut config = AppConfig::default();
        config.backend.startup_timeout_secs = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("startup_timeout_secs"));
    }

    #[test]
    fn validation_rejects_inverted_summary_lengths() {
        let mut config = AppConfig::default();
        config.backend.summary_min_length = 500;
        assert!(validate_config(&config).is_err());
        assert!(validate_config(&AppConfig::default()).is_ok());
    }
}
