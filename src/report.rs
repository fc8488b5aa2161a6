//! Periodic report timer
//!
//! The timer belongs to the build: `BuildHooks::build_started` acquires it
//! and `BuildHooks::build_finished` releases it. Dropping the handle stops the
//! background thread as well.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};

use crate::host::HostConfig;

/// Interval between two reports
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(20 * 60);

/// The task run on every tick
pub type ReportFn = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone)]
pub struct ReportTimer {
    interval: Duration,
    report: ReportFn,
}

impl ReportTimer {
    pub fn new(interval: Duration, report: ReportFn) -> Self {
        ReportTimer { interval, report }
    }

    /// Runs the report once right away, then once per interval until the
    /// returned handle is cancelled or dropped
    pub fn start(&self) -> ReportHandle {
        let (stop, stopped) = bounded::<()>(1);
        let interval = self.interval;
        let report = Arc::clone(&self.report);

        let thread = thread::spawn(move || {
            tracing::debug!(?interval, "report timer started");
            report();
            loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => report(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            tracing::debug!("report timer stopped");
        });

        ReportHandle {
            stop: Some(stop),
            thread: Some(thread),
        }
    }
}

/// Owned handle of a running timer
pub struct ReportHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl ReportHandle {
    /// Stops the timer and waits for its thread to finish
    pub fn cancel(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("report timer thread panicked");
            }
        }
    }
}

impl Drop for ReportHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Build lifecycle hooks
#[derive(Default)]
pub struct BuildHooks {
    timer: Option<ReportTimer>,
    running: Option<ReportHandle>,
}

impl BuildHooks {
    pub fn new(timer: Option<ReportTimer>) -> Self {
        BuildHooks {
            timer,
            running: None,
        }
    }

    /// Starts the report timer unless it already runs
    pub fn build_started(&mut self) {
        if self.running.is_some() {
            return;
        }
        if let Some(timer) = &self.timer {
            self.running = Some(timer.start());
        }
    }

    /// Stops the report timer and runs the host's build done callbacks
    pub fn build_finished(&mut self, host: &HostConfig) {
        if let Some(handle) = self.running.take() {
            handle.cancel();
        }
        host.build_done();
    }

    pub fn is_reporting(&self) -> bool {
        self.running.is_some()
    }
}
