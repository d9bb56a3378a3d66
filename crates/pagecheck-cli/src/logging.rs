//! Diagnostic logging setup

use tracing_subscriber::EnvFilter;

use crate::config::Verbosity;

/// Filter for the given verbosity; `RUST_LOG` wins when set
#[must_use]
pub fn env_filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.log_directive()))
}

/// Install the global subscriber writing to stderr
///
/// Calling it twice is harmless; the second call is ignored.
pub fn init_tracing(verbosity: Verbosity) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbosity))
        .with_writer(std::io::stderr)
        .with_target(verbosity.is_debug())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing(Verbosity::Quiet);
        init_tracing(Verbosity::Debug);
        tracing::debug!("still alive");
    }

    #[test]
    fn test_filter_builds_for_every_level() {
        for verbosity in [
            Verbosity::Quiet,
            Verbosity::Normal,
            Verbosity::Verbose,
            Verbosity::Debug,
        ] {
            let filter = env_filter(verbosity);
            assert!(!filter.to_string().is_empty());
        }
    }
}
