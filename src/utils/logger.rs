use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Target for refused outbound requests and other security events.
pub const SECURITY_TARGET: &str = "security";

/// Overrides the built-in directives without touching `RUST_LOG` for dependencies.
pub const LOG_ENV_VAR: &str = "HOMEGARDEN_LOG";

/// Crate level plus a separate level for the security target, so refusals
/// stay visible when the crate itself is quiet and can be routed on their own.
pub fn default_directives(verbose: bool) -> String {
    let crate_level = if verbose { "debug" } else { "info" };
    format!("homegarden_core={},{}=warn", crate_level, SECURITY_TARGET)
}

fn build_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)))
}

pub fn init_cli_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(build_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(verbose)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// Structured output for service deployments. The target field lets an
/// aggregator split `security` events from the rest.
pub fn init_json_logger() {
    tracing_subscriber::registry()
        .with(build_filter(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .json()
                .with_current_span(false),
        )
        .init();
}
