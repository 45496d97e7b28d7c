use std::sync::OnceLock;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::infrastructure::config::TelemetryConfig;

static TELEMETRY: OnceLock<()> = OnceLock::new();

/// Installs the global subscriber once. Later calls are no-ops, so binaries
/// and tests can both call it freely.
pub fn init(config: &TelemetryConfig) {
    TELEMETRY.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.default_filter))
            .unwrap_or_else(|_| EnvFilter::new("info"));
        let registry = tracing_subscriber::registry().with(env_filter);
        let installed = if config.log_format.eq_ignore_ascii_case("pretty") {
            registry
                .with(tracing_subscriber::fmt::layer().pretty())
                .try_init()
        } else {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
        };
        // another subscriber may already be installed, e.g. by a test harness
        let _ = installed;
    });
}
