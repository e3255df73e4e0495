use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Installs a global tracing subscriber for hosts that have none.
///
/// Honours `RUST_LOG`, defaulting to `info`. Audit entries are emitted under
/// the `dimsync::audit` target, so `RUST_LOG=dimsync::audit=debug` shows
/// every skip as well.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_with_default("info")
}

/// Like [`init`], with an explicit fallback filter directive.
pub fn init_with_default(directive: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(directive))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).compact())
        .try_init()?;

    Ok(())
}

