use anyhow::{anyhow, Context, Result};
use jsonc_parser::{parse_to_serde_value, ParseOptions};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// CSV ledger location. Relative paths resolve against the working directory.
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,

    /// Trailing window (minutes) searched for near-duplicate entries.
    #[serde(default = "default_duplicate_window_minutes")]
    pub duplicate_window_minutes: u64,

    /// Similarity ratio above which an entry is flagged as a probable duplicate.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,

    /// Seconds to wait for the duplicate confirmation before cancelling.
    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,

    /// Port for the static development server.
    #[serde(default = "default_server_port")]
    pub server_port: u16,

    /// Input device index override; default input device when unset.
    #[serde(default)]
    pub audio_device: Option<usize>,

    #[serde(default)]
    pub transcription: TranscriptionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptionConfig {
    #[serde(default = "default_stt_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_stt_model")]
    pub model: String,

    /// Name of the environment variable holding the service API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("expenses.csv")
}

fn default_duplicate_window_minutes() -> u64 {
    5
}

fn default_similarity_threshold() -> f32 {
    0.7
}

fn default_confirm_timeout_secs() -> u64 {
    10
}

fn default_server_port() -> u16 {
    8000
}

fn default_stt_endpoint() -> String {
    "https://api.groq.com/openai/v1/audio/transcriptions".to_string()
}

fn default_stt_model() -> String {
    "whisper-large-v3".to_string()
}

fn default_api_key_env() -> String {
    "GROQ_API_KEY".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ledger_path: default_ledger_path(),
            duplicate_window_minutes: default_duplicate_window_minutes(),
            similarity_threshold: default_similarity_threshold(),
            confirm_timeout_secs: default_confirm_timeout_secs(),
            server_port: default_server_port(),
            audio_device: None,
            transcription: TranscriptionConfig::default(),
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            endpoint: default_stt_endpoint(),
            model: default_stt_model(),
            api_key_env: default_api_key_env(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

#[derive(Clone)]
pub struct ConfigManager {
    inner: Arc<ConfigManagerInner>,
}

struct ConfigManagerInner {
    config: RwLock<Config>,
}

impl ConfigManager {
    pub fn load() -> Result<Self> {
        let config_dir = directories::ProjectDirs::from("", "", "voxpense")
            .context("Failed to get config directory")?
            .config_dir()
            .to_path_buf();

        fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

        let config_path = config_dir.join("config.jsonc");

        let config = if config_path.exists() {
            Self::read_config_from_disk(&config_path)?
        } else {
            let default_config = Config::default();
            Self::write_config_file(&config_path, &default_config)?;
            tracing::info!("Created default config at: {:?}", config_path);
            default_config
        };

        tracing::info!("Loaded config from: {:?}", config_path);

        Ok(Self {
            inner: Arc::new(ConfigManagerInner {
                config: RwLock::new(config),
            }),
        })
    }

    pub fn get(&self) -> Config {
        self.inner
            .config
            .read()
            .expect("config lock poisoned")
            .clone()
    }

    fn read_config_from_disk(path: &Path) -> Result<Config> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file at {:?}", path))?;
        Self::parse_config(&content)
    }

    fn write_config_file(path: &Path, config: &Config) -> Result<()> {
        let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
        fs::write(path, json).with_context(|| format!("Failed to write config file at {:?}", path))
    }

    fn parse_config(content: &str) -> Result<Config> {
        let value = parse_to_serde_value(content, &ParseOptions::default())
            .context("Failed to parse config as JSONC")?
            .ok_or_else(|| anyhow!("Config file did not contain a JSON value"))?;
        serde_json::from_value(value).context("Failed to deserialize config")
    }
}
