use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_level(), json: false }
    }
}

impl LoggingConfig {
    /// Installs the global `tracing` subscriber. Call once at process
    /// startup, before any other tracing calls.
    pub fn init(&self) {
        let filter = EnvFilter::try_new(&self.level).unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
        if self.json {
            subscriber.json().init();
        } else {
            subscriber.init();
        }
    }
}
