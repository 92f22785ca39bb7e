use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Console logging settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is unset, e.g. `"info"` or `"cardinal_dds=debug"`.
    pub default_level: String,
    pub ansi: bool,
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_level: "info".to_string(),
            ansi: true,
            with_target: true,
        }
    }
}

/// Install a global `tracing` subscriber writing to stderr.
///
/// Returns `false` if a subscriber was already installed; the existing one is
/// left in place, so repeated calls are harmless.
pub fn init_logging(config: &LoggingConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(config.ansi)
                .with_target(config.with_target),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!(
            version = env!("CARGO_PKG_VERSION"),
            default_level = %config.default_level,
            "logging initialized"
        );
    }
    installed
}
