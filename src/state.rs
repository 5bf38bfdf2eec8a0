//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::progress::ProgressTracker;
use crate::qr::QrCache;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    qr_cache: QrCache,
    progress: ProgressTracker,
}

impl AppState {
    /// Create a new application state, opening the QR cache directory.
    pub fn new(config: Config) -> std::io::Result<Self> {
        let qr_cache = QrCache::new(config.cache.dir.clone())?;
        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                qr_cache,
                progress: ProgressTracker::new(),
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn qr_cache(&self) -> &QrCache {
        &self.inner.qr_cache
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.inner.progress
    }
}
