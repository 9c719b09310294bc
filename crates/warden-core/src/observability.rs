//! Observability infrastructure: structured logging with consistent spans.
//!
//! This module provides initialization helpers and span constructors so
//! every component logs with the same fields.

use std::sync::Once;
use tracing::Span;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, fmt};

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default)]
pub enum LogFormat {
    /// JSON structured logs (for production).
    Json,
    /// Pretty-printed logs (for development).
    #[default]
    Pretty,
}

/// Initializes the logging subsystem.
///
/// Call once at application startup. Safe to call multiple times;
/// subsequent calls are no-ops.
///
/// # Environment Variables
///
/// - `RUST_LOG`: Controls log levels (e.g., `info`, `warden_session=debug`)
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().json())
                    .init();
            }
            LogFormat::Pretty => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(fmt::layer().pretty())
                    .init();
            }
        }
    });
}

/// Creates a span for session operations with standard fields.
///
/// # Example
///
/// ```rust
/// use warden_core::observability::session_span;
///
/// let span = session_span("prepare", "alpha-host");
/// let _guard = span.enter();
/// // ... do session operation
/// ```
#[must_use]
pub fn session_span(operation: &str, host: &str) -> Span {
    tracing::info_span!("session", op = operation, host = host)
}
