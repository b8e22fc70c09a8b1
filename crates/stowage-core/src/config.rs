//! Configuration module
//!
//! Stowage reads its settings from the process environment (optionally seeded from a
//! `.env` file). Credentials for the blob store are not part of this struct; they are
//! resolved per tenant through the integration named here.

use std::env;

use crate::constants::{DEFAULT_BULK_UPLOAD_CONCURRENCY, DEFAULT_INTEGRATION_NAME};
use crate::storage_types::StorageBackend;

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Attachment storage configuration
#[derive(Clone, Debug)]
pub struct StowageConfig {
    pub storage_backend: StorageBackend,
    /// Integration name the credential resolver is asked for
    pub integration_name: String,
    pub bulk_upload_concurrency: usize,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
}

impl Default for StowageConfig {
    fn default() -> Self {
        Self {
            storage_backend: StorageBackend::Azure,
            integration_name: DEFAULT_INTEGRATION_NAME.to_string(),
            bulk_upload_concurrency: DEFAULT_BULK_UPLOAD_CONCURRENCY,
            database_url: None,
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
        }
    }
}

impl StowageConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(value) => value.parse::<StorageBackend>()?,
            Err(_) => StorageBackend::Azure,
        };

        let integration_name = env::var("STOWAGE_INTEGRATION")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_INTEGRATION_NAME.to_string());

        let config = StowageConfig {
            storage_backend,
            integration_name,
            bulk_upload_concurrency: env::var("STOWAGE_BULK_UPLOAD_CONCURRENCY")
                .unwrap_or_else(|_| DEFAULT_BULK_UPLOAD_CONCURRENCY.to_string())
                .parse()
                .map_err(|_| {
                    anyhow::anyhow!("STOWAGE_BULK_UPLOAD_CONCURRENCY must be a valid number")
                })?,
            database_url: env::var("DATABASE_URL").ok(),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.bulk_upload_concurrency == 0 {
            return Err(anyhow::anyhow!(
                "STOWAGE_BULK_UPLOAD_CONCURRENCY must be at least 1"
            ));
        }
        if self.integration_name.trim().is_empty() {
            return Err(anyhow::anyhow!("STOWAGE_INTEGRATION cannot be empty"));
        }
        Ok(())
    }

    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }
}
