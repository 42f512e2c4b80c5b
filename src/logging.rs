use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

/// HTTP stack crates that log every connection at debug level.
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "h2"];

/// `default_filter` plus a `warn` cap for the HTTP stack, unless the caller already set one.
fn fallback_directives(default_filter: &str) -> String {
    let mut directives: Vec<String> = default_filter
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect();
    for target in QUIET_TARGETS {
        let prefix = format!("{target}=");
        if !directives.iter().any(|d| d.starts_with(&prefix)) {
            directives.push(format!("{target}=warn"));
        }
    }
    directives.join(",")
}

/// Global fmt subscriber on stderr, so stdout carries only replies.
///
/// `RUST_LOG` wins; otherwise `default_filter` is used with the HTTP stack capped at `warn`.
pub fn init_tracing(default_filter: &str) -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(fallback_directives(default_filter)));

    SubscriberBuilder::default()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {}", e))
}
