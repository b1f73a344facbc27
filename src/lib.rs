pub mod config;
pub mod models;
pub mod db; // Patient dashboard read store
pub mod pipeline; // Image -> request -> inference service -> display model
pub mod panel; // Triage + SOAP note submission flow

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise [`config::default_log_filter`].
/// Safe to call more than once: later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
}
