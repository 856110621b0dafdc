use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub backend: BackendConfig,
    pub capture: CaptureSettings,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Analysis backend root, e.g. "http://localhost:8000/api/v1"
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CaptureSettings {
    pub sample_rate: u32,
    pub channels: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_greeting")]
    pub greeting: String,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_greeting() -> String {
    "Hi! I'm LeaseGuard AI. Ask me anything about your lease or tenant rights.".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            greeting: default_greeting(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                name: "leaseguard-voice".to_string(),
                http: HttpConfig {
                    bind: "127.0.0.1".to_string(),
                    port: 7071,
                },
            },
            backend: BackendConfig {
                base_url: "http://localhost:8000/api/v1".to_string(),
                timeout_secs: default_timeout_secs(),
            },
            capture: CaptureSettings {
                sample_rate: 16000,
                channels: 1,
            },
            chat: ChatConfig::default(),
        }
    }
}
