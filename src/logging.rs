//! Structured logging setup.
//!
//! The library only emits `tracing` events; applications that want them on
//! stdout call [`init_logging`] once at startup.

use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, ServerConfig};

/// Installs a global `fmt` subscriber. `RUST_LOG` wins over `default_filter`.
/// Returns `false` if a global subscriber was already installed.
pub fn init_logging(default_filter: &str, format: LogFormat) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    let installed = match format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.is_ok()
}

pub fn init_from_config(config: &ServerConfig) -> bool {
    init_logging(&config.log_filter, config.log_format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_is_harmless() {
        init_logging("debug", LogFormat::Pretty);
        assert!(!init_logging("info", LogFormat::Json));
    }
}
