use anyhow::Context;
use chrono_tz::Tz;
use linecut_notify::notifier::{WebpushAssets, DEFAULT_WEBPUSH_ASSET};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// IANA name of the zone schedules and display timestamps are read in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// JSON file the tree is seeded from at startup and saved to on shutdown.
    /// When unset the tree lives only in memory.
    #[serde(default)]
    pub snapshot_path: Option<String>,
    #[serde(default)]
    pub sweep: SweepConfig,
    #[serde(default)]
    pub push: PushConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepConfig {
    #[serde(default = "default_sweep_enabled")]
    pub enabled: bool,
    #[serde(default = "default_sweep_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            enabled: default_sweep_enabled(),
            interval_secs: default_sweep_interval_secs(),
        }
    }
}

/// Push provider selection. `provider` names a plugin in the delivery
/// registry (`"log"` or `"fcm"`); the remaining fields are passed to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushConfig {
    #[serde(default = "default_push_provider")]
    pub provider: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    /// Env var holding the access token when `access_token` is unset.
    #[serde(default)]
    pub access_token_env: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_webpush_asset")]
    pub icon: String,
    #[serde(default = "default_webpush_asset")]
    pub badge: String,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            provider: default_push_provider(),
            project_id: None,
            access_token: None,
            access_token_env: None,
            endpoint: None,
            icon: default_webpush_asset(),
            badge: default_webpush_asset(),
        }
    }
}

impl PushConfig {
    /// JSON config handed to the provider plugin. Unset fields are omitted.
    pub fn provider_config(&self) -> Value {
        let mut map = Map::new();
        let fields = [
            ("project_id", &self.project_id),
            ("access_token", &self.access_token),
            ("access_token_env", &self.access_token_env),
            ("endpoint", &self.endpoint),
        ];
        for (key, value) in fields {
            if let Some(value) = value {
                map.insert(key.to_string(), Value::String(value.clone()));
            }
        }
        Value::Object(map)
    }

    pub fn assets(&self) -> WebpushAssets {
        WebpushAssets {
            icon: self.icon.clone(),
            badge: self.badge.clone(),
        }
    }
}

fn default_http_port() -> u16 {
    8080
}

fn default_timezone() -> String {
    "America/Sao_Paulo".to_string()
}

fn default_sweep_enabled() -> bool {
    true
}

fn default_sweep_interval_secs() -> u64 {
    1800
}

fn default_push_provider() -> String {
    "log".to_string()
}

fn default_webpush_asset() -> String {
    DEFAULT_WEBPUSH_ASSET.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            timezone: default_timezone(),
            snapshot_path: None,
            sweep: SweepConfig::default(),
            push: PushConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{path}'"))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file '{path}'"))?;
        config.timezone()?;
        if config.sweep.interval_secs == 0 {
            anyhow::bail!("sweep.interval_secs must be greater than zero");
        }
        Ok(config)
    }

    pub fn timezone(&self) -> anyhow::Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("Invalid timezone '{}': {e}", self.timezone))
    }
}
