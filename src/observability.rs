//! Initialisation des logs (tracing).

use tracing_subscriber::EnvFilter;

/// Logs JSON horodatés, filtrables via RUST_LOG (défaut : info).
///
/// Les appels suivants sont sans effet.
pub fn init() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false)
        .try_init();
}
