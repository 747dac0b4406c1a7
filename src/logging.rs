//! tracing-subscriber setup. `RUST_LOG` wins over the built-in defaults.

use anyhow::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "info,tailwind_relay=debug,tower_http=debug"
    } else {
        "info"
    }
}

/// Install the global subscriber. Call once, before anything logs.
pub fn init(verbose: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .try_init()?;

    Ok(())
}
