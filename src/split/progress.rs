//! Progress reporting and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::report::ExtractionSource;

/// Receives a notification after each page is written.
pub trait ProgressSink {
    /// `done` pages out of `total` are finished; `source` tells how the
    /// last one was named.
    fn page_done(&mut self, done: u32, total: u32, source: ExtractionSource);
}

impl<F> ProgressSink for F
where
    F: FnMut(u32, u32, ExtractionSource),
{
    fn page_done(&mut self, done: u32, total: u32, source: ExtractionSource) {
        self(done, total, source)
    }
}

/// Discards progress notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn page_done(&mut self, _done: u32, _total: u32, _source: ExtractionSource) {}
}

/// Shared flag that asks a running split to stop.
///
/// The splitter checks the flag between pages. A page already being
/// processed is finished and written; remaining pages are skipped.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Visible to every clone of this token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
