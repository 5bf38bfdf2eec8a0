//! Configuration management for the Chest Numbers server

use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub document: DocumentConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory holding the generated QR artifacts. May live on ephemeral
    /// storage; every artifact is regenerable from its number.
    pub dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct DocumentConfig {
    /// Prefix for the suggested download filename.
    pub filename_prefix: String,
    /// Caption printed under each chest number.
    pub caption: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            cache: CacheConfig {
                dir: PathBuf::from("/tmp/qrcache"),
            },
            document: DocumentConfig {
                filename_prefix: "Jerseys".to_string(),
                caption: "GNDEC ATHLETIX".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(defaults.server.port),
            },
            cache: CacheConfig {
                dir: env::var("QR_CACHE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.cache.dir),
            },
            document: DocumentConfig {
                filename_prefix: env::var("PDF_FILENAME_PREFIX")
                    .unwrap_or(defaults.document.filename_prefix),
                caption: env::var("CARD_CAPTION").unwrap_or(defaults.document.caption),
            },
        }
    }
}
