use crate::ai::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};
use crate::error::{AppError, Result};
use crate::history::DEFAULT_HISTORY_CAP;
use crate::orchestrator::DEFAULT_TTS_MAX_CHARS;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DEPLOYMENT: &str = "gpt-35-turbo";
pub const DEFAULT_API_VERSION: &str = "2023-05-15";

// Application settings. Credentials usually come from the environment (or a
// `.env` file) and are layered on top of the file at load time.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub azure_openai_endpoint: Option<String>,
    pub azure_openai_key: Option<String>,
    pub azure_openai_deployment: String,
    pub azure_openai_api_version: String,
    pub openai_api_key: Option<String>,
    pub model: String,
    pub azure_speech_key: Option<String>,
    pub azure_speech_region: Option<String>,
    pub speech_voice: String,
    pub speech_language: String,
    pub history_cap: usize,
    pub sanity_drift: [i32; 2],
    pub tts_max_chars: usize,
    pub listen_timeout_secs: u64,
    pub record_secs: u64,
    pub max_tokens: u32,
    pub temperature: f32,
    pub audio_output_enabled: bool,
    pub audio_input_enabled: bool,
    pub debug_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            azure_openai_endpoint: None,
            azure_openai_key: None,
            azure_openai_deployment: DEFAULT_DEPLOYMENT.to_string(),
            azure_openai_api_version: DEFAULT_API_VERSION.to_string(),
            openai_api_key: None,
            model: "gpt-4o-mini".to_string(),
            azure_speech_key: None,
            azure_speech_region: None,
            speech_voice: "en-US-GuyNeural".to_string(),
            speech_language: "en-US".to_string(),
            history_cap: DEFAULT_HISTORY_CAP,
            sanity_drift: [-5, 5],
            tts_max_chars: DEFAULT_TTS_MAX_CHARS,
            listen_timeout_secs: 10,
            record_secs: 5,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            audio_output_enabled: true,
            audio_input_enabled: true,
            debug_mode: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelBackend {
    Azure {
        endpoint: String,
        api_key: String,
        deployment: String,
        api_version: String,
    },
    OpenAI {
        api_key: String,
        model: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechCredentials {
    pub key: String,
    pub region: String,
    pub voice: String,
    pub language: String,
}

pub fn data_dir() -> Result<PathBuf> {
    let home_dir = dir::home_dir().ok_or(AppError::NoHomeDir)?;
    Ok(home_dir.join("parallel_paths").join("data"))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl Settings {
    /// Reads the settings file (writing the defaults on first run), then
    /// applies credentials from the environment.
    pub fn load() -> Result<Self> {
        let path = data_dir()?.join("settings.json");
        let mut settings = if path.exists() {
            Self::load_settings_from_file(&path)?
        } else {
            let settings = Self::default();
            if let Err(e) = settings.save_to_file(&path) {
                log::error!("Failed to write default settings to {}: {e}", path.display());
            }
            settings
        };

        if let Err(e) = dotenvy::dotenv() {
            log::debug!("No .env file loaded: {e}");
        }
        settings.apply_env(|name| std::env::var(name).ok());
        Ok(settings)
    }

    pub fn load_settings_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&data)?;
        Ok(settings)
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let data = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(path)?;
        file.write_all(data.as_bytes())?;
        Ok(())
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let overlay = |target: &mut Option<String>, name: &str| {
            if let Some(value) = lookup(name).filter(|v| !v.trim().is_empty()) {
                *target = Some(value);
            }
        };
        overlay(&mut self.azure_openai_endpoint, "AZURE_OPENAI_ENDPOINT");
        overlay(&mut self.azure_openai_key, "AZURE_OPENAI_KEY");
        overlay(&mut self.openai_api_key, "OPENAI_API_KEY");
        overlay(&mut self.azure_speech_key, "AZURE_SPEECH_KEY");
        overlay(&mut self.azure_speech_region, "AZURE_SPEECH_REGION");

        if let Some(deployment) = lookup("AZURE_OPENAI_DEPLOYMENT") {
            self.azure_openai_deployment = deployment;
        }
        if let Some(version) = lookup("AZURE_OPENAI_API_VERSION") {
            self.azure_openai_api_version = version;
        }
    }

    // Azure wins when both backends are configured.
    pub fn model_backend(&self) -> Result<ModelBackend> {
        if let (Some(endpoint), Some(api_key)) = (
            non_empty(&self.azure_openai_endpoint),
            non_empty(&self.azure_openai_key),
        ) {
            return Ok(ModelBackend::Azure {
                endpoint: endpoint.to_string(),
                api_key: api_key.to_string(),
                deployment: self.azure_openai_deployment.clone(),
                api_version: self.azure_openai_api_version.clone(),
            });
        }
        if let Some(api_key) = non_empty(&self.openai_api_key) {
            return Ok(ModelBackend::OpenAI {
                api_key: api_key.to_string(),
                model: self.model.clone(),
            });
        }
        Err(AppError::MissingModelConfig)
    }

    pub fn speech_credentials(&self) -> Option<SpeechCredentials> {
        Some(SpeechCredentials {
            key: non_empty(&self.azure_speech_key)?.to_string(),
            region: non_empty(&self.azure_speech_region)?.to_string(),
            voice: self.speech_voice.clone(),
            language: self.speech_language.clone(),
        })
    }

    pub fn sanity_drift_range(&self) -> RangeInclusive<i32> {
        let [a, b] = self.sanity_drift;
        a.min(b)..=a.max(b)
    }

    pub fn listen_timeout(&self) -> Duration {
        Duration::from_secs(self.listen_timeout_secs)
    }

    pub fn record_window(&self) -> Duration {
        Duration::from_secs(self.record_secs)
    }
}
