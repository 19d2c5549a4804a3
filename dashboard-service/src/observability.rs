use tracing_subscriber::EnvFilter;

/// Levels used when `RUST_LOG` is unset. A set `RUST_LOG` replaces them entirely.
const DEFAULT_DIRECTIVES: &str = "warn,dashboard_service=info,meter_client=info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES))
}

/// Install the fmt subscriber for the server and the CLI. Safe to call twice;
/// the second call keeps the first subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .try_init();
}
