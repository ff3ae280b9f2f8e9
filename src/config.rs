/// Configuration management for Screendiff
use crate::error::{ServiceError, ServiceResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Default listen port
pub const DEFAULT_PORT: u16 = 8082;

/// Default request body limit (50 MiB)
pub const DEFAULT_UPLOAD_LIMIT: usize = 50 * 1024 * 1024;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Maximum accepted request body in bytes
    pub upload_limit: usize,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub uploads_directory: PathBuf,
    pub outputs_directory: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            service: ServiceConfig {
                hostname: "0.0.0.0".to_string(),
                port: DEFAULT_PORT,
                upload_limit: DEFAULT_UPLOAD_LIMIT,
            },
            storage: StorageConfig {
                uploads_directory: PathBuf::from("./uploads"),
                outputs_directory: PathBuf::from("./outputs"),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

/// Parse a numeric environment value, naming the variable on failure
fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> ServiceResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ServiceError::Internal(format!("Invalid value for {}: {}", name, value)))
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ServiceResult<Self> {
        dotenv::dotenv().ok();

        let defaults = Self::default();

        let hostname =
            env::var("SCREENDIFF_HOSTNAME").unwrap_or_else(|_| defaults.service.hostname.clone());
        let port = match env::var("SCREENDIFF_PORT") {
            Ok(value) => parse_number("SCREENDIFF_PORT", &value)?,
            Err(_) => DEFAULT_PORT,
        };
        let upload_limit = match env::var("SCREENDIFF_UPLOAD_LIMIT") {
            Ok(value) => parse_number("SCREENDIFF_UPLOAD_LIMIT", &value)?,
            Err(_) => DEFAULT_UPLOAD_LIMIT,
        };

        let uploads_directory = env::var("SCREENDIFF_UPLOADS_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.storage.uploads_directory);
        let outputs_directory = env::var("SCREENDIFF_OUTPUTS_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.storage.outputs_directory);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                upload_limit,
            },
            storage: StorageConfig {
                uploads_directory,
                outputs_directory,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> ServiceResult<()> {
        if self.service.hostname.is_empty() {
            return Err(ServiceError::Internal("Hostname cannot be empty".to_string()));
        }

        if self.service.upload_limit == 0 {
            return Err(ServiceError::Internal(
                "Upload limit must be greater than zero".to_string(),
            ));
        }

        // Uploads and outputs are independent key spaces
        if self.storage.uploads_directory == self.storage.outputs_directory {
            return Err(ServiceError::Internal(
                "Uploads and outputs directories must differ".to_string(),
            ));
        }

        Ok(())
    }

    /// Socket address string to bind
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.service.hostname, self.service.port)
    }
}
