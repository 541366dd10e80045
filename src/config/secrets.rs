use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Deserialize;

use crate::error::Error;

#[derive(Debug, Clone, Deserialize)]
pub struct SecretsConfig {
    #[serde(default = "default_cache_ttl_seconds")]
    pub cache_ttl_seconds: u64,
    /// When set, missing secrets fail fast at startup instead of leaving
    /// the dependent venue/provider disabled.
    #[serde(default)]
    pub require_secrets: bool,
}

fn default_cache_ttl_seconds() -> u64 {
    300
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self { cache_ttl_seconds: default_cache_ttl_seconds(), require_secrets: false }
    }
}

struct CachedSecret {
    value: String,
    fetched_at: Instant,
}

/// Resolves secrets by env var, with a short TTL cache to avoid
/// re-reading the environment on every call. A remote secret store would
/// plug in ahead of the env var fallback; only the fallback is
/// implemented here.
pub struct SecretsLoader {
    cache_ttl: Duration,
    require_secrets: bool,
    cache: Mutex<HashMap<String, CachedSecret>>,
}

impl SecretsLoader {
    #[must_use]
    pub fn new(config: &SecretsConfig) -> Self {
        Self {
            cache_ttl: Duration::from_secs(config.cache_ttl_seconds),
            require_secrets: config.require_secrets,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> crate::Result<Option<String>> {
        {
            let cache = self.cache.lock();
            if let Some(cached) = cache.get(key) {
                if cached.fetched_at.elapsed() < self.cache_ttl {
                    return Ok(Some(cached.value.clone()));
                }
            }
        }

        match std::env::var(key) {
            Ok(value) => {
                self.cache.lock().insert(key.to_string(), CachedSecret { value: value.clone(), fetched_at: Instant::now() });
                Ok(Some(value))
            }
            Err(_) if self.require_secrets => Err(Error::MissingSecret(key.to_string())),
            Err(_) => Ok(None),
        }
    }

    pub fn require(&self, key: &str) -> crate::Result<String> {
        self.get(key)?.ok_or_else(|| Error::MissingSecret(key.to_string()))
    }
}
