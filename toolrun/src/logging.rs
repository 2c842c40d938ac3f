//! Diagnostics about toolrun itself, such as how options merged and which
//! variant took an input. Written to stderr and filtered by `RUST_LOG`.
//!
//! What the external tools print does not go through here. The executor hands
//! every output line, the `Executing ...` header and each build-stop message
//! to a [`LogSink`](crate::io::sink::LogSink), so `--log-file` and stdout carry
//! the full build log at any `RUST_LOG` level.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "warn";

/// Install the stderr subscriber.
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
///
/// ```bash
/// RUST_LOG=toolrun::io=debug toolrun nuget-pack src/App/App.csproj
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_keeps_first_subscriber() {
        init();
        init();
        tracing::debug!("still logging after a second init");
    }
}
