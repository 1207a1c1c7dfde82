//! Layered runtime configuration.
//!
//! Settings come from three layers, later layers winning:
//!
//! 1. Built-in defaults ([`Settings::default`])
//! 2. An optional YAML file passed with `--config`
//! 3. Command-line flags and their environment variables ([`Settings::apply_cli`])
//!
//! Every section is `#[serde(default)]`, so a config file only needs the keys
//! it wants to change:
//!
//! ```yaml
//! llm:
//!   model: gpt-4o
//! video:
//!   fps: 24
//! ```

use crate::cli::Cli;
use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
pub const DEFAULT_VOICE: &str = "en-US-GuyNeural";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub http: HttpSettings,
    pub llm: LlmSettings,
    pub tts: TtsSettings,
    pub video: VideoSettings,
}

/// Outbound HTTP for the product page and its images.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub accept_language: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "en-US,en;q=0.9".to_string(),
        }
    }
}

/// OpenAI-compatible chat completions service used in delegated mode.
#[derive(Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmSettings {
    pub api_base: String,
    /// Never read from or written to the config file.
    #[serde(skip)]
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_retries: usize,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.openai.com/v1".to_string(),
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 320,
            max_retries: 1,
            timeout_secs: 60,
        }
    }
}

impl std::fmt::Debug for LlmSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmSettings")
            .field("api_base", &self.api_base)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl LlmSettings {
    /// Delegated mode is only possible with a non-empty credential.
    pub fn has_credentials(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

#[derive(Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TtsSettings {
    pub voice: String,
    /// Language code for the Google Translate backend.
    pub language: String,
    #[serde(skip)]
    pub azure_key: Option<String>,
    pub azure_region: Option<String>,
    pub timeout_secs: u64,
}

impl Default for TtsSettings {
    fn default() -> Self {
        Self {
            voice: DEFAULT_VOICE.to_string(),
            language: "en".to_string(),
            azure_key: None,
            azure_region: None,
            timeout_secs: 60,
        }
    }
}

impl std::fmt::Debug for TtsSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtsSettings")
            .field("voice", &self.voice)
            .field("language", &self.language)
            .field("azure_key", &self.azure_key.as_ref().map(|_| "<redacted>"))
            .field("azure_region", &self.azure_region)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct VideoSettings {
    pub fps: u32,
    pub target_height: u32,
    /// Extra scale reached at the end of each clip (0.05 = 105%).
    pub zoom: f64,
    pub max_parallel_downloads: usize,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            fps: 30,
            target_height: 720,
            zoom: 0.05,
            max_parallel_downloads: 4,
        }
    }
}

impl Settings {
    /// Load defaults, then overlay the YAML file at `path` if one is given.
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let Some(path) = path else {
            debug!("No config file given; using defaults");
            return Ok(Settings::default());
        };

        let raw = std::fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
        let settings = Self::from_yaml(&raw)
            .map_err(|e| PipelineError::Config(format!("{}: {e}", path.display())))?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(settings)
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Settings::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Overlay values given on the command line or through the environment.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(key) = &cli.openai_api_key {
            self.llm.api_key = Some(key.clone());
        }
        if let Some(model) = &cli.prompt_model {
            self.llm.model = model.clone();
        }
        if let Some(voice) = &cli.voice {
            self.tts.voice = voice.clone();
        }
        if let Some(key) = &cli.azure_speech_key {
            self.tts.azure_key = Some(key.clone());
        }
        if let Some(region) = &cli.azure_speech_region {
            self.tts.azure_region = Some(region.clone());
        }
        if let Some(fps) = cli.fps {
            self.video.fps = fps;
        }
    }
}
