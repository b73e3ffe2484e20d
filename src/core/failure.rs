//! Failure sink implementations.
//!
//! Workers never let a task failure escape; they hand it to a sink instead.
//! The default sink logs through `tracing`; the in-memory sink keeps a
//! bounded buffer for tests and inspection.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::error;

use crate::core::task::TaskFailure;

/// A task failure as seen by a sink.
#[derive(Debug)]
pub struct FailureReport {
    /// Name of the worker thread that ran the task.
    pub worker: String,
    /// Name attached to the task, if any.
    pub task_name: Option<String>,
    /// What went wrong.
    pub failure: TaskFailure,
}

/// Sink abstraction for uncaught task failures.
pub trait FailureSink: Send + Sync + 'static {
    /// Record a failure. Called on the worker thread right after the task
    /// returns, so implementations should be quick.
    fn report(&self, report: FailureReport);
}

/// Default sink: one `error!` event per failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFailureSink;

impl FailureSink for TracingFailureSink {
    fn report(&self, report: FailureReport) {
        error!(
            worker = %report.worker,
            task = report.task_name.as_deref().unwrap_or("<unnamed>"),
            panicked = report.failure.is_panic(),
            error = %report.failure,
            "Task failed"
        );
    }
}

/// In-memory sink with a bounded buffer; oldest reports are evicted first.
#[derive(Debug)]
pub struct InMemoryFailureSink {
    reports: Mutex<VecDeque<FailureReport>>,
    max_reports: usize,
}

impl InMemoryFailureSink {
    /// Create a new in-memory sink that keeps at most `max_reports`.
    #[must_use]
    pub fn new(max_reports: usize) -> Self {
        Self {
            reports: Mutex::new(VecDeque::with_capacity(max_reports.min(1024))),
            max_reports,
        }
    }

    /// Convenience constructor returning the sink behind an `Arc`, ready to
    /// be shared with a pool and inspected by the caller.
    #[must_use]
    pub fn shared(max_reports: usize) -> Arc<Self> {
        Arc::new(Self::new(max_reports))
    }

    /// Number of reports currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }

    /// Whether no report is held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.lock().is_empty()
    }

    /// Remove and return every held report, oldest first.
    #[must_use]
    pub fn take(&self) -> Vec<FailureReport> {
        self.reports.lock().drain(..).collect()
    }
}

impl FailureSink for InMemoryFailureSink {
    fn report(&self, report: FailureReport) {
        if self.max_reports == 0 {
            return;
        }
        let mut reports = self.reports.lock();
        if reports.len() >= self.max_reports {
            reports.pop_front();
        }
        reports.push_back(report);
    }
}
