use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt::{self, format::FmtSpan}};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVES: &str = "info";

/// Installs the global subscriber, ignoring an already installed one.
pub fn init() {
    let _ = try_init(DEFAULT_DIRECTIVES);
}

/// Installs the global subscriber with `default_directives` as the fallback filter.
///
/// Span close events (with busy/idle timings of the decode, measure and fit
/// stages) are printed only when the active filter enables `debug`.
pub fn try_init(default_directives: &str) -> Result<(), TryInitError> {
    let from_env = std::env::var("RUST_LOG").ok();
    let env_filter = match from_env.as_deref() {
        Some(directives) if !directives.is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::new(default_directives),
    };

    let is_debug = {
        let rendered = env_filter.to_string();
        rendered.contains("debug") || rendered.contains("trace")
    };

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_timer(fmt::time::uptime())
        .with_span_events(if is_debug {
            FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init();
        init();
        assert!(try_init(DEFAULT_DIRECTIVES).is_err());
    }
}
