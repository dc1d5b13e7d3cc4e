use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Runtime configuration for the service finder client.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the service directory API, always ending in `/`.
    pub api_url: String,
    pub env: Environment,
    pub log_level: String,
    /// Distance used when nothing has been persisted yet.
    pub default_distance: u32,
    /// Presentation theme name. Carried for the UI layer; the core ignores it.
    pub theme: String,
    /// Location of the durable key-value file.
    pub state_path: PathBuf,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Debounce before a full reload after an authorization failure.
    pub reload_delay_ms: u64,
}
