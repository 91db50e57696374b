//! Tracing subscriber setup, configured from [`super::config::AppConfig`].

use crate::infrastructure::config::AppConfig;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber once per process. Safe to call
/// more than once; subsequent calls are no-ops.
pub fn init(cfg: &AppConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    let result = if cfg.log_format == "json" {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if result.is_err() {
        // Already initialized (e.g. a prior test in the same process); fine.
    }
}
