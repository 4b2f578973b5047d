use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub storage: StorageSettings,
    #[serde(default)]
    pub ledger: LedgerSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerSettings {
    /// Minutes during which only the owner may cancel an open order.
    pub cancel_cooldown_minutes: i64,
}

/// Upper bound for `cancel_cooldown_minutes`: one week.
pub const MAX_CANCEL_COOLDOWN_MINUTES: i64 = 7 * 24 * 60;

impl LedgerSettings {
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if !(0..=MAX_CANCEL_COOLDOWN_MINUTES).contains(&self.cancel_cooldown_minutes) {
            return Err(config::ConfigError::Message(format!(
                "ledger.cancel_cooldown_minutes must be between 0 and {}, got {}",
                MAX_CANCEL_COOLDOWN_MINUTES, self.cancel_cooldown_minutes
            )));
        }
        Ok(())
    }
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            cancel_cooldown_minutes: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_key_prefix() -> String {
    "ledger".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        let settings: Self = builder.build()?.try_deserialize()?;
        settings.ledger.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_toml(raw: &str) -> Settings {
        config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_fill_optional_sections() {
        let settings = from_toml(
            r#"
            [storage]
            backend = "memory"
            "#,
        );

        assert_eq!(settings.storage.backend, StorageBackend::Memory);
        assert_eq!(settings.storage.key_prefix, "ledger");
        assert_eq!(settings.ledger.cancel_cooldown_minutes, 30);
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn test_load_default_file() {
        let settings = Settings::new().unwrap();
        assert!(settings.ledger.cancel_cooldown_minutes > 0);
        assert!(!settings.storage.key_prefix.is_empty());
    }

    #[test]
    fn test_cancel_cooldown_bounds() {
        let within = |minutes| LedgerSettings {
            cancel_cooldown_minutes: minutes,
        };

        assert!(within(0).validate().is_ok());
        assert!(within(MAX_CANCEL_COOLDOWN_MINUTES).validate().is_ok());
        assert!(within(-1).validate().is_err());
        assert!(within(MAX_CANCEL_COOLDOWN_MINUTES + 1).validate().is_err());
        assert!(within(i64::MAX).validate().is_err());
    }

    #[test]
    fn test_redis_backend() {
        let settings = from_toml(
            r#"
            [storage]
            backend = "redis"
            redis_url = "redis://cache:6379"
            key_prefix = "food"

            [ledger]
            cancel_cooldown_minutes = 10

            [logging]
            level = "debug"
            format = "json"
            "#,
        );

        assert_eq!(settings.storage.backend, StorageBackend::Redis);
        assert_eq!(settings.storage.redis_url, "redis://cache:6379");
        assert_eq!(settings.ledger.cancel_cooldown_minutes, 10);
        assert_eq!(settings.logging.format, "json");
    }
}
