//! User-visible transient notices.
//!
//! Fire-and-forget: the core hands over a message and a severity and moves
//! on. The presentation layer decides how (or whether) to show it.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, severity: Severity);
}

/// Routes notices into the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info | Severity::Success => tracing::info!(?severity, "{message}"),
            Severity::Warning => tracing::warn!("{message}"),
            Severity::Error => tracing::error!("{message}"),
        }
    }
}
