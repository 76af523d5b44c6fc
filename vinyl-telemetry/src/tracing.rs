use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{EnvFilter, fmt};

/// Default filter directive when `RUST_LOG` is not set.
const DEFAULT_DIRECTIVE: &str = "info";

/// Initializes the global tracing subscriber for a job binary.
///
/// Log verbosity is controlled through `RUST_LOG` and defaults to `info`.
/// Each of the vinyl jobs is a one-shot batch process, so there is no log
/// flushing or rotation to manage here.
pub fn init_tracing(app_name: &str) -> Result<(), TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init()?;

    info!(app = app_name, "tracing initialized");

    Ok(())
}
