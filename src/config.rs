use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::env;
use tracing::{info, warn};

// Import logging macros
use crate::{log_system_event, log_validation};

/// Complete application configuration loaded from environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub quiz: QuizConfig,
    pub sync: SyncConfig,
}

/// Database connection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

/// Logging system configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file_enabled: bool,
    pub console_enabled: bool,
    pub log_directory: String,
}

/// Attempt behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct QuizConfig {
    /// Countdown per question in timed mode
    pub timed_seconds_per_question: u32,
    pub sweep_interval_ms: u64,
    /// When set, deleting a quiz or section requires this phrase
    pub delete_phrase: Option<String>,
}

/// Remote admin sync endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    pub endpoint: Option<String>,
    pub timeout_secs: u64,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Result<Self> {
        log_system_event!(config, "Loading application configuration from environment variables");

        let config = Config {
            database: DatabaseConfig::from_env()?,
            server: ServerConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
            quiz: QuizConfig::from_env()?,
            sync: SyncConfig::from_env()?,
        };

        log_system_event!(config, "Configuration loaded successfully");
        Ok(config)
    }

    /// Log a summary of loaded configuration (without sensitive data)
    pub fn log_configuration_summary(&self) {
        info!(
            database_url_masked = %mask_sensitive_data(&self.database.url),
            server_address = %format!("{}:{}", self.server.host, self.server.port),
            log_level = %self.logging.level,
            timed_seconds_per_question = self.quiz.timed_seconds_per_question,
            delete_guard_enabled = self.quiz.delete_phrase.is_some(),
            admin_sync_enabled = self.sync.endpoint.is_some(),
            "Configuration summary"
        );
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.database.url.starts_with("sqlite:") {
            return Err(anyhow!("DATABASE_URL must start with 'sqlite:'"));
        }

        if self.server.port == 0 {
            return Err(anyhow!("Server port must be greater than 0"));
        }

        if self.quiz.timed_seconds_per_question == 0 {
            return Err(anyhow!("QUIZ_TIMED_SECONDS must be greater than 0"));
        }

        if self.quiz.sweep_interval_ms == 0 {
            return Err(anyhow!("QUIZ_SWEEP_INTERVAL_MS must be greater than 0"));
        }

        if let Some(endpoint) = &self.sync.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(anyhow!("ADMIN_SYNC_URL must be an http(s) URL"));
            }
        } else {
            warn!("ADMIN_SYNC_URL not set - admin sync is disabled");
        }

        if !["trace", "debug", "info", "warn", "error"]
            .iter()
            .any(|level| self.logging.level.to_lowercase().starts_with(level))
        {
            warn!("Unusual log level '{}', EnvFilter may fall back to defaults", self.logging.level);
        }

        log_validation!(success, "configuration", "Configuration validation completed successfully");
        Ok(())
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self> {
        let url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite:quiz_library.db".to_string());

        Ok(DatabaseConfig { url })
    }
}

impl ServerConfig {
    fn from_env() -> Result<Self> {
        let port_str = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string());

        let port = port_str.parse::<u16>()
            .map_err(|_| anyhow!("Invalid PORT value: '{}'. Must be a number between 1-65535", port_str))?;

        let host = env::var("HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string());

        Ok(ServerConfig { port, host })
    }
}

impl LoggingConfig {
    fn from_env() -> Result<Self> {
        let level = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info,quiz_library=debug".to_string());

        let file_enabled = env::var("LOG_FILE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let console_enabled = env::var("LOG_CONSOLE_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse::<bool>()
            .unwrap_or(true);

        let log_directory = env::var("LOG_DIRECTORY")
            .unwrap_or_else(|_| "logs".to_string());

        Ok(LoggingConfig {
            level,
            file_enabled,
            console_enabled,
            log_directory,
        })
    }
}

impl QuizConfig {
    fn from_env() -> Result<Self> {
        let seconds_str = env::var("QUIZ_TIMED_SECONDS")
            .unwrap_or_else(|_| "15".to_string());
        let timed_seconds_per_question = seconds_str.parse::<u32>()
            .map_err(|_| anyhow!("Invalid QUIZ_TIMED_SECONDS value: '{}'", seconds_str))?;

        let interval_str = env::var("QUIZ_SWEEP_INTERVAL_MS")
            .unwrap_or_else(|_| "1000".to_string());
        let sweep_interval_ms = interval_str.parse::<u64>()
            .map_err(|_| anyhow!("Invalid QUIZ_SWEEP_INTERVAL_MS value: '{}'", interval_str))?;

        let delete_phrase = env::var("QUIZ_DELETE_PHRASE")
            .ok()
            .map(|phrase| phrase.trim().to_string())
            .filter(|phrase| !phrase.is_empty());

        Ok(QuizConfig {
            timed_seconds_per_question,
            sweep_interval_ms,
            delete_phrase,
        })
    }
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            timed_seconds_per_question: 15,
            sweep_interval_ms: 1000,
            delete_phrase: None,
        }
    }
}

impl SyncConfig {
    fn from_env() -> Result<Self> {
        let endpoint = env::var("ADMIN_SYNC_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        let timeout_str = env::var("ADMIN_SYNC_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string());
        let timeout_secs = timeout_str.parse::<u64>()
            .map_err(|_| anyhow!("Invalid ADMIN_SYNC_TIMEOUT_SECS value: '{}'", timeout_str))?;

        Ok(SyncConfig { endpoint, timeout_secs })
    }
}

/// Mask sensitive data in configuration for safe logging
fn mask_sensitive_data(data: &str) -> String {
    let char_count = data.chars().count();
    if char_count <= 8 {
        "*".repeat(char_count)
    } else {
        let head: String = data.chars().take(4).collect();
        let tail: String = data.chars().skip(char_count - 4).collect();
        format!("{}***{}", head, tail)
    }
}
