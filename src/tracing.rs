use crate::logger::Severity;

/// Re-emits a composed logger line as a `tracing` event.
pub(crate) fn forward(severity: Severity, origin: &str, line: u32, composed: &str) {
    let message = composed.trim_end();
    match severity {
        Severity::Debug => tracing::debug!(origin, line, "{message}"),
        Severity::Info => tracing::info!(origin, line, "{message}"),
        Severity::Warning => tracing::warn!(origin, line, "{message}"),
        Severity::Error => tracing::error!(origin, line, "{message}"),
    }
}
