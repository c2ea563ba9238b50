use anyhow::{Context, Result};
use rostro_inventory::RepositoryConfig;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// CLI configuration, loaded from environment variables.
pub struct Config {
    /// Path to the SQLite key-value database.
    pub db_path: PathBuf,
    /// Base URL of the face recognition service.
    pub api_base_url: Url,
    /// Simulated latency before an add takes effect.
    pub add_latency: Duration,
    /// Simulated latency before an update takes effect.
    pub update_latency: Duration,
    /// Simulated latency before a delete takes effect.
    pub delete_latency: Duration,
}

impl Config {
    /// Load configuration from `ROSTRO_*` environment variables with defaults.
    pub fn from_env() -> Result<Self> {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("rostro");

        let db_path = std::env::var("ROSTRO_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("rostro.db"));

        let raw_url = std::env::var("ROSTRO_API_BASE_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string());
        let api_base_url = Url::parse(&raw_url)
            .with_context(|| format!("ROSTRO_API_BASE_URL is not a valid URL: {raw_url}"))?;

        Ok(Self {
            db_path,
            api_base_url,
            add_latency: env_millis("ROSTRO_ADD_LATENCY_MS", 1000),
            update_latency: env_millis("ROSTRO_UPDATE_LATENCY_MS", 1000),
            delete_latency: env_millis("ROSTRO_DELETE_LATENCY_MS", 500),
        })
    }

    pub fn repository_config(&self) -> RepositoryConfig {
        RepositoryConfig {
            add_latency: self.add_latency,
            update_latency: self.update_latency,
            delete_latency: self.delete_latency,
        }
    }
}

fn env_millis(key: &str, default: u64) -> Duration {
    let millis = std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default);
    Duration::from_millis(millis)
}
