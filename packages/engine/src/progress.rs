//! Progress reporting for engine runs.
//!
//! The engine reports file-level progress through [`ProgressCallback`] so
//! the library stays free of any terminal rendering. The CLI plugs in an
//! `indicatif` bar; tests and library callers use [`NullProgress`].

/// Receives progress updates from a run.
///
/// Updates arrive once per input file, from the thread driving the run.
/// Implementations must be `Send + Sync` so the CLI can hold them behind an
/// `Arc`.
pub trait ProgressCallback: Send + Sync {
    /// Set the total expected units of work.
    fn set_total(&self, total: u64);

    /// Advance progress by `delta` units.
    fn inc(&self, delta: u64);

    /// Update the message displayed alongside the progress indicator.
    fn set_message(&self, msg: String);

    /// Mark progress as complete with a final message.
    fn finish(&self, msg: String);
}

/// Ignores all progress updates.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn set_total(&self, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn set_message(&self, _msg: String) {}
    fn finish(&self, _msg: String) {}
}
