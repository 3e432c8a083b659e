use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `CRM_SERVER__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub preview: PreviewConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

/// Audience preview tuning. The debounce window bounds how often a burst of
/// rule edits turns into an evaluation request.
#[derive(Debug, Clone, Deserialize)]
pub struct PreviewConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_sample_cap")]
    pub sample_cap: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "default_dev_password")]
    pub dev_password: String,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
}

// Default functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    5000
}
fn default_debounce_ms() -> u64 {
    500
}
fn default_sample_cap() -> usize {
    5
}
fn default_dev_password() -> String {
    "crm2024".to_string()
}
fn default_session_ttl_hours() -> i64 {
    24
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            sample_cap: default_sample_cap(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            dev_password: default_dev_password(),
            session_ttl_hours: default_session_ttl_hours(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            preview: PreviewConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("CRM_SERVER")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
