//! Fixed-interval background jobs.
//!
//! # Invariants
//! - A job never runs concurrently with itself.
//! - Stopping (or dropping) the handle wakes the loop immediately; no
//!   further run starts afterwards.

use log::{error, info};
use std::io;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Handle to a running interval loop.
pub struct IntervalHandle {
    name: String,
    stop_tx: Option<mpsc::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

/// Runs `job` every `every` on a dedicated thread named after the job.
///
/// The first run happens one full interval after spawning.
pub fn spawn_interval<F>(name: impl Into<String>, every: Duration, mut job: F) -> io::Result<IntervalHandle>
where
    F: FnMut() + Send + 'static,
{
    let name = name.into();
    let (stop_tx, stop_rx) = mpsc::channel::<()>();
    let thread_name = name.clone();

    let join = thread::Builder::new()
        .name(format!("schedule-{name}"))
        .spawn(move || {
            info!(
                "event=schedule_start module=scheduler status=ok schedule={thread_name} every_ms={}",
                every.as_millis()
            );
            loop {
                match stop_rx.recv_timeout(every) {
                    Err(RecvTimeoutError::Timeout) => job(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            info!("event=schedule_stop module=scheduler status=ok schedule={thread_name}");
        })?;

    Ok(IntervalHandle {
        name,
        stop_tx: Some(stop_tx),
        join: Some(join),
    })
}

impl IntervalHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signals the loop to stop and waits for the current run to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    /// Blocks until the loop exits (only after a stop signal or a job panic).
    pub fn wait(mut self) {
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                error!(
                    "event=schedule_stop module=scheduler status=error schedule={} error_code=job_panicked",
                    self.name
                );
            }
        }
    }

    fn shutdown(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(join) = self.join.take() {
            if join.join().is_err() {
                error!(
                    "event=schedule_stop module=scheduler status=error schedule={} error_code=job_panicked",
                    self.name
                );
            }
        }
    }
}

impl Drop for IntervalHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
