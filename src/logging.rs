//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LoggingConfig;

/// Build the filter: `RUST_LOG` wins, otherwise the configured level for this
/// crate with noisy HTTP internals capped at `warn`.
#[must_use]
pub fn build_filter(config: &LoggingConfig, verbose: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let level = if verbose { "debug" } else { config.level.as_str() };
    EnvFilter::new(format!(
        "{level},hyper=warn,hyper_util=warn,reqwest=warn,rustls=warn"
    ))
}

/// Install the global subscriber. Calling it twice is harmless; the second
/// call is ignored.
pub fn init_logging(config: &LoggingConfig, verbose: bool) {
    let filter = build_filter(config, verbose);

    let result = if config.format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .try_init()
    };

    if let Err(err) = result {
        tracing::debug!("Logging already initialized: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_overrides_configured_level() {
        // SAFETY: Test environment, clearing a variable only this test reads
        unsafe {
            std::env::remove_var("RUST_LOG");
        }
        let config = LoggingConfig::default();
        let filter = build_filter(&config, true).to_string();
        assert!(filter.contains("debug"));

        let filter = build_filter(&config, false).to_string();
        assert!(filter.contains("info"));
        assert!(filter.contains("reqwest=warn"));
    }
}
