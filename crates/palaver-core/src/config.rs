use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

/// Top-level configuration for the Palaver client.
///
/// Loaded from `~/.palaver/config.toml` by default. Each section corresponds
/// to one concern of the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub general: GeneralConfig,
    pub session: RuntimeSettings,
    pub models: ModelsConfig,
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Base URL of the assistant backend.
    pub backend_url: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:5000".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Runtime settings shared with the backend configuration resource.
///
/// Language and duration changes apply to the defaults of future voice
/// sessions immediately; an in-flight session keeps the values it started
/// with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Maximum conversation turns sent as context with each message.
    pub max_context_turns: usize,
    /// BCP 47 language tag for speech recognition.
    pub recognition_lang: String,
    /// BCP 47 language tag for speech synthesis.
    pub synthesis_lang: String,
    /// Hard limit on one voice-capture session, in seconds.
    pub max_recording_secs: u64,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            max_context_turns: 5,
            recognition_lang: "en-US".to_string(),
            synthesis_lang: "en-US".to_string(),
            max_recording_secs: 30,
        }
    }
}

/// Model variants offered in the selector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// All selectable model identifiers.
    pub options: Vec<String>,
    /// The one variant capable of image input.
    pub multimodal: String,
    /// Selected model at startup.
    pub default_model: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            options: vec!["qwen3:8b".to_string(), "qwen3-vl:8b".to_string()],
            multimodal: "qwen3-vl:8b".to_string(),
            default_model: "qwen3:8b".to_string(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
