/// Configuration management for the file relay
use crate::error::{RelayError, RelayResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Default listening port
pub const DEFAULT_PORT: u16 = 10000;

/// Default upload limit (100 MiB)
pub const DEFAULT_MAX_UPLOAD_SIZE: u64 = 100 * 1024 * 1024;

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
    /// Absolute URL prefix for links handed to API clients
    pub public_url: Option<String>,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub upload_directory: PathBuf,
    pub public_directory: PathBuf,
    pub max_upload_size: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> RelayResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("RELAY_HOSTNAME").unwrap_or_else(|_| "0.0.0.0".to_string());

        // PORT is what most hosting platforms inject
        let port = match env::var("PORT").or_else(|_| env::var("RELAY_PORT")) {
            Ok(raw) => raw
                .parse()
                .map_err(|_| RelayError::Config(format!("Invalid port number: {}", raw)))?,
            Err(_) => DEFAULT_PORT,
        };

        let public_url = env::var("RELAY_PUBLIC_URL")
            .ok()
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        let upload_directory = env::var("RELAY_UPLOAD_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./uploads"));
        let public_directory = env::var("RELAY_PUBLIC_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./public"));
        let max_upload_size = match env::var("RELAY_MAX_UPLOAD_SIZE") {
            Ok(raw) => raw.parse().map_err(|_| {
                RelayError::Config(format!("Invalid upload size limit: {}", raw))
            })?,
            Err(_) => DEFAULT_MAX_UPLOAD_SIZE,
        };

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                public_url,
            },
            storage: StorageConfig {
                upload_directory,
                public_directory,
                max_upload_size,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> RelayResult<()> {
        if self.service.hostname.is_empty() {
            return Err(RelayError::Config("Hostname cannot be empty".to_string()));
        }

        if self.storage.upload_directory.as_os_str().is_empty() {
            return Err(RelayError::Config(
                "Upload directory cannot be empty".to_string(),
            ));
        }

        if self.storage.max_upload_size == 0 {
            return Err(RelayError::Config(
                "Upload size limit must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Address to bind the listener to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.service.hostname, self.service.port)
    }
}
