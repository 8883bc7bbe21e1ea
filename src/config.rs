use secrecy::Secret;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,

    // Notification collaborator (optional webhook)
    pub notify_webhook_url: Option<String>,
    pub notify_webhook_token: Option<Secret<String>>,

    // Policy toggles
    /// Whether a petition may have more than one open appeal at a time.
    pub allow_multiple_open_appeals: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        // Load .env file if it exists (for local development)
        let _ = dotenvy::dotenv();

        let config = config::Config::builder()
            .add_source(config::Environment::default().separator("__"))
            .build()?;

        Ok(Self {
            database_url: config.get("database_url")?,
            host: config.get("host").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: config.get("port")?,

            notify_webhook_url: config.get("notify_webhook_url").ok(),
            notify_webhook_token: config
                .get::<String>("notify_webhook_token")
                .ok()
                .map(Secret::new),

            allow_multiple_open_appeals: config.get("allow_multiple_open_appeals").unwrap_or(false),
        })
    }
}
