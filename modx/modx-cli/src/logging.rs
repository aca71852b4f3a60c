//! Subscriber setup for the binary.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Crates whose logs follow the configured level; everything else stays at warn.
const CRATES: [&str; 6] = [
    "modx",
    "modx_core",
    "modx_remote",
    "modx_vfs",
    "modx_tree",
    "modx_cli",
];

/// Filter directives that put every modx crate at `level`.
pub fn directives(level: &str) -> String {
    let mut parts: Vec<String> = CRATES
        .iter()
        .map(|krate| format!("{}={}", krate, level))
        .collect();
    parts.push("warn".to_string());
    parts.join(",")
}

/// `RUST_LOG` wins; otherwise `--verbose` means debug, else the configured level.
pub fn init_logging(verbose: bool, configured_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { configured_level };
        EnvFilter::new(directives(level))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
