use serde::Deserialize;

/// Root application configuration. Loaded from an optional `leadnectar.toml`
/// file and environment variables with the prefix `LEADNECTAR__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_tenant_id")]
    pub tenant_id: String,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub sequences: SequenceConfig,
    #[serde(default)]
    pub campaigns: CampaignConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Connection settings for the hosted data backend.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: String,
    #[serde(default = "default_store_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SequenceConfig {
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default = "default_validate_on_mutation")]
    pub validate_on_mutation: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CampaignConfig {
    #[serde(default = "default_enforce_funnel")]
    pub enforce_funnel: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_json")]
    pub json: bool,
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_tenant_id() -> String {
    "default".to_string()
}
fn default_backend() -> String {
    "memory".to_string()
}
fn default_store_url() -> String {
    "http://localhost:54321".to_string()
}
fn default_max_steps() -> usize {
    50
}
fn default_validate_on_mutation() -> bool {
    true
}
fn default_enforce_funnel() -> bool {
    true
}
fn default_log_json() -> bool {
    true
}
fn default_log_filter() -> String {
    "leadnectar=info".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: default_store_url(),
            api_key: None,
        }
    }
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            validate_on_mutation: default_validate_on_mutation(),
        }
    }
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            enforce_funnel: default_enforce_funnel(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json: default_log_json(),
            filter: default_log_filter(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tenant_id: default_tenant_id(),
            store: StoreConfig::default(),
            sequences: SequenceConfig::default(),
            campaigns: CampaignConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from `leadnectar.toml` (if present) and environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("leadnectar")
    }

    /// Same as [`AppConfig::load`] with an explicit config file stem.
    pub fn load_from(file_stem: &str) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name(file_stem).required(false))
            .add_source(
                config::Environment::with_prefix("LEADNECTAR")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.store.backend, "memory");
        assert_eq!(config.sequences.max_steps, 50);
        assert!(config.sequences.validate_on_mutation);
        assert!(config.campaigns.enforce_funnel);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = AppConfig::load_from("does-not-exist-leadnectar").unwrap();
        assert_eq!(config.tenant_id, "default");
        assert_eq!(config.logging.filter, "leadnectar=info");
    }

    #[test]
    fn test_partial_section_keeps_field_defaults() {
        let config: AppConfig = config::Config::builder()
            .set_override("sequences.max_steps", 5)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();
        assert_eq!(config.sequences.max_steps, 5);
        assert!(config.sequences.validate_on_mutation);
    }
}
