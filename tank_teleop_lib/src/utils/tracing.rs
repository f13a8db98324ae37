//! Centralized tracing initialization for the console binaries.
//!
//! Uses a thread-local default subscriber so tests and embedding
//! applications can install their own global subscriber without conflict.

use tracing::subscriber::DefaultGuard;
use tracing_subscriber::EnvFilter;

/// Initialize tracing with a thread-local subscriber.
///
/// - Respects the RUST_LOG environment variable (defaults to "info")
/// - Compact output without file/line metadata
///
/// The returned guard keeps the subscriber active and must stay in scope
/// for the lifetime of the program. Tasks only see it when they run on the
/// same thread, so the console uses a current-thread runtime.
///
/// # Example
/// ```no_run
/// use tank_teleop_lib::init_tracing;
///
/// fn main() {
///     let _guard = init_tracing();
///     // console code here
/// }
/// ```
pub fn init_tracing() -> DefaultGuard {
    use tracing_subscriber::layer::SubscriberExt;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false);

    let subscriber = tracing_subscriber::Registry::default()
        .with(env_filter)
        .with(fmt_layer);

    tracing::subscriber::set_default(subscriber)
}
