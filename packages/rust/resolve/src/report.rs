//! Callbacks for observing a resolution as it runs.
//!
//! The pipeline pushes everything a front end could want to show: leveled
//! log lines, page bodies, a step counter, and growing result snapshots.
//! Sinks implement only what they can render; unimplemented capabilities
//! fall back to no-ops.

use bundlescout_shared::Bundle;

/// Severity attached to a reporter log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Step counter for a resolution run.
///
/// The subject page fetch is one step and every candidate detail fetch is
/// one more, so `total` grows once after the candidate list is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    /// Steps finished so far.
    pub current: usize,
    /// Steps known in total.
    pub total: usize,
    /// What the pipeline is doing right now.
    pub message: String,
}

/// Observer for resolution events. Only `log` is required.
pub trait Reporter: Send + Sync {
    /// A human-readable event with a severity.
    fn log(&self, level: LogLevel, message: &str);

    /// A titled block of supporting detail, such as a fetched page body.
    fn detail(&self, _title: &str, _body: &str) {}

    /// Step counter update.
    fn progress(&self, _progress: &Progress) {}

    /// Result snapshot: interim while bundles resolve, final once at the end.
    fn bundles(&self, _bundles: &[Bundle], _is_final: bool) {}
}

/// No-op reporter for headless or test usage.
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn log(&self, _level: LogLevel, _message: &str) {}
}
