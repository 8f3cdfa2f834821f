//! Progress reporting hooks.
//!
//! Library code reports through [`ProgressCallback`] and never decides
//! how progress is shown. The CLI renders it with terminal bars; tests
//! pass [`NullProgress`].

/// Sink for progress of a transfer (in bytes) or a run (in items).
pub trait ProgressCallback: Send + Sync {
    /// Announces how many units are expected and restarts the count.
    fn set_total(&self, total: u64);

    /// Records `delta` more units done.
    fn inc(&self, delta: u64);

    /// Replaces the label shown next to the indicator.
    fn set_message(&self, msg: String);

    /// Ends reporting, leaving `msg` visible.
    fn finish(&self, msg: String);

    /// Ends reporting and removes the indicator.
    fn finish_and_clear(&self);
}

/// Discards every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
    fn finish_and_clear(&self) {}
}
