//! Progress reporting with cooperative cancellation
//!
//! Long operations (file import, recording, document load) call
//! [`ProgressNotifier::step`] between discrete units of work. Listeners see a
//! [`ProgressEvent`] and may request cancellation through it; the driving
//! loop notices on its next step and unwinds with [`Error::Cancelled`].
//! Nothing is ever interrupted mid-unit.

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancel flag
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress of one operation, handed to listeners
#[derive(Debug)]
pub struct ProgressEvent<'a> {
    /// Short operation label, e.g. "import" or "load"
    pub operation: &'a str,
    pub completed: u64,
    /// Total units, 0 when unknown
    pub total: u64,
    cancel: &'a CancelFlag,
}

impl ProgressEvent<'_> {
    /// Ask the driving loop to stop at the next unit boundary
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Completed fraction in `0.0..=1.0`, `None` when the total is unknown
    pub fn fraction(&self) -> Option<f64> {
        (self.total > 0).then(|| (self.completed as f64 / self.total as f64).min(1.0))
    }
}

type ProgressListener = Box<dyn FnMut(&ProgressEvent<'_>) + Send>;

/// Progress fan-out for a single long operation
#[derive(Default)]
pub struct ProgressNotifier {
    listeners: Vec<ProgressListener>,
    cancel: CancelFlag,
}

impl ProgressNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifier that observes an externally owned cancel flag
    pub fn with_cancel_flag(cancel: CancelFlag) -> Self {
        Self {
            listeners: Vec::new(),
            cancel,
        }
    }

    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: FnMut(&ProgressEvent<'_>) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Report progress, then poll the cancel flag
    ///
    /// Returns `Err(Error::Cancelled)` if cancellation was requested before
    /// or during this step.
    pub fn step(&mut self, operation: &str, completed: u64, total: u64) -> Result<()> {
        self.check()?;
        let event = ProgressEvent {
            operation,
            completed,
            total,
            cancel: &self.cancel,
        };
        for listener in &mut self.listeners {
            listener(&event);
        }
        self.check()
    }

    /// Poll the cancel flag without reporting
    pub fn check(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

impl std::fmt::Debug for ProgressNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressNotifier")
            .field("listeners", &self.listeners.len())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_listener_sees_every_step() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut progress = ProgressNotifier::new();
        progress.subscribe(move |event| sink.lock().unwrap().push((event.completed, event.fraction())));

        progress.step("import", 1, 4).unwrap();
        progress.step("import", 4, 4).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![(1, Some(0.25)), (4, Some(1.0))]);
    }

    #[test]
    fn test_listener_cancellation_is_seen_by_driver() {
        let mut progress = ProgressNotifier::new();
        progress.subscribe(|event| {
            if event.completed >= 2 {
                event.cancel();
            }
        });

        let mut completed = 0;
        let outcome = (1..=10).try_for_each(|unit| {
            progress.step("work", unit, 10)?;
            completed = unit;
            Ok::<_, Error>(())
        });

        assert!(matches!(outcome, Err(Error::Cancelled)));
        assert_eq!(completed, 1);
    }

    #[test]
    fn test_external_flag() {
        let flag = CancelFlag::new();
        let mut progress = ProgressNotifier::with_cancel_flag(flag.clone());
        assert!(progress.step("load", 0, 0).is_ok());
        flag.cancel();
        assert!(matches!(progress.check(), Err(Error::Cancelled)));
    }
}
