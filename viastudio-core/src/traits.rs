//! Trait definitions for VIA Studio.

/// Receives human-readable progress messages during a generation.
///
/// Messages arrive in the order they were produced. They are cosmetic and
/// carry no state beyond the text itself.
pub trait ProgressSink: Send + Sync {
    /// Reports one progress message.
    fn report(&self, message: &str);
}

impl<F> ProgressSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn report(&self, message: &str) {
        self(message);
    }
}

/// A sink that drops every message.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _message: &str) {}
}
