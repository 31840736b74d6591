//! Tracing configuration for lapwatch
//!
//! Installs the global `tracing-subscriber` registry with an env filter and
//! a stdout fmt layer. Adapters in `lw-infra` log through the `log` facade;
//! the subscriber's log bridge forwards those records into the same output.
//!
//! ## Behavior / 行为
//!
//! - **Development**: debug level for the tour crates
//! - **Production**: info level
//! - **RUST_LOG** overrides the defaults when set

use std::io;

use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

fn is_development() -> bool {
    cfg!(debug_assertions)
}

/// Default filter directives when `RUST_LOG` is not set.
fn build_filter_directives(is_dev: bool) -> Vec<String> {
    let level = if is_dev { "debug" } else { "info" };
    vec![
        "info".to_string(),
        format!("lapwatch={level}"),
        format!("lapwatch_lib={level}"),
        format!("lw_app={level}"),
        format!("lw_infra={level}"),
        // Document and driver traces are per-frame; keep them out of dev logs.
        "lw_platform=info".to_string(),
    ]
}

/// Initialize the global tracing subscriber.
///
/// Call once from `main` before the tour is wired.
///
/// # Errors / 错误
///
/// Fails when a global subscriber is already installed.
pub fn init_tracing_subscriber() -> anyhow::Result<()> {
    let is_dev = is_development();
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(build_filter_directives(is_dev).join(",")));

    let stdout_layer = fmt::layer()
        .with_level(true)
        .with_target(true)
        .with_file(is_dev)
        .with_line_number(is_dev)
        .with_ansi(cfg!(not(test)))
        .with_writer(io::stdout);

    registry().with(env_filter).with(stdout_layer).try_init()?;
    Ok(())
}
