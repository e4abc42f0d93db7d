//! Gateway configuration

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// HTTP gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Root directory for documents, logs, and caches
    pub data_dir: PathBuf,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8088,
            data_dir: PathBuf::from("data"),
        }
    }
}

impl ApiConfig {
    /// Load configuration from the environment (.env honored).
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut cfg = Self::default();

        // platform-injected PORT takes priority
        if let Ok(port) = std::env::var("PORT") {
            if let Ok(p) = port.parse::<u16>() {
                cfg.port = p;
            }
        }

        if let Ok(host) = std::env::var("POMONA_HOST") {
            cfg.host = host;
        }
        if let Ok(port) = std::env::var("POMONA_PORT") {
            if let Ok(p) = port.parse::<u16>() {
                cfg.port = p;
            }
        }
        if let Ok(dir) = std::env::var("POMONA_DATA_DIR") {
            cfg.data_dir = PathBuf::from(dir);
        }

        Ok(cfg)
    }
}
