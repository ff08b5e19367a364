//! Cancellation and deadlines for a migration run
//!
//! A [`Context`] is checked at every I/O boundary the migrator controls: before the
//! version table is ensured, before history is read, and before each migration's
//! transaction is opened. An in-flight transaction is never interrupted; it finishes
//! (or fails) at the speed the connection allows and the run stops afterwards.

use crate::migration::MigrationError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Caller-supplied cancellation flag plus an optional deadline
///
/// Clones share the cancellation flag, so a clone handed to another thread (a signal
/// handler, a watchdog) can stop a run in progress.
#[derive(Debug, Clone, Default)]
pub struct Context {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl Context {
    /// A context that is never cancelled and has no deadline
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().deadline(Instant::now() + timeout)
    }

    /// Replace the deadline, keeping the shared cancellation flag
    #[must_use]
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Request cancellation; takes effect at the next checkpoint
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Time left before the deadline, if one is set
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Checkpoint: fails if the context was cancelled or its deadline has passed
    ///
    /// # Errors
    ///
    /// Returns `MigrationError::Cancelled` or `MigrationError::DeadlineExceeded`.
    pub fn check(&self) -> Result<(), MigrationError> {
        if self.is_cancelled() {
            return Err(MigrationError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(MigrationError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}
