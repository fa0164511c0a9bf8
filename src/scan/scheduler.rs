//! Background scan queue
//!
//! Directory loads are handed to a single dedicated worker thread, one at a
//! time. The caller queues root paths and polls for finished trees without
//! ever blocking:
//!
//! ```text
//! Idle --queue_scan--> Scanning(path) --worker done--> Idle (result ready)
//!   ^                                                       |
//!   +-------------------------poll_result-------------------+
//! ```
//!
//! A finished result must be collected with `poll_result` before the next
//! pending path is dispatched.

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use parking_lot::Mutex;
use std::any::Any;
use std::collections::VecDeque;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info};

use crate::error::ScanError;
use crate::state::{AssetDirectory, ScanOptions};

/// Result of one background scan
pub type ScanResult = Result<AssetDirectory, ScanError>;

/// Order in which pending paths are dispatched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanOrder {
    /// First queued, first scanned
    #[default]
    Fifo,
    /// Most recently queued first
    Lifo,
}

#[derive(Debug, Default)]
struct SchedulerState {
    pending: VecDeque<PathBuf>,
    /// Path handed to the worker whose result has not been collected yet
    current: Option<PathBuf>,
}

/// Single-worker queue of directory scans
#[derive(Debug)]
pub struct ScanScheduler {
    order: ScanOrder,
    state: Mutex<SchedulerState>,
    job_tx: Option<Sender<PathBuf>>,
    result_rx: Receiver<ScanResult>,
    worker: Option<JoinHandle<()>>,
}

impl ScanScheduler {
    /// Start a scheduler whose worker loads directories with `options`
    pub fn new(options: ScanOptions) -> io::Result<Self> {
        Self::with_order(options, ScanOrder::default())
    }

    pub fn with_order(options: ScanOptions, order: ScanOrder) -> io::Result<Self> {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<PathBuf>();
        let (result_tx, result_rx) = crossbeam_channel::unbounded::<ScanResult>();

        let worker = thread::Builder::new()
            .name("asset-scan-worker".into())
            .spawn(move || worker_loop(options, job_rx, result_tx))?;

        Ok(Self {
            order,
            state: Mutex::new(SchedulerState::default()),
            job_tx: Some(job_tx),
            result_rx,
            worker: Some(worker),
        })
    }

    pub fn order(&self) -> ScanOrder {
        self.order
    }

    /// Add a directory to the scan queue.
    /// Immediately starts the scan if nothing else is outstanding.
    pub fn queue_scan(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let mut state = self.state.lock();
        debug!(path = %path.display(), "Queued scan");
        state.pending.push_back(path);
        self.maybe_start_next(&mut state);
    }

    /// Take a finished scan, if there is one, and start the next pending
    /// scan. Never blocks.
    pub fn poll_result(&self) -> Option<ScanResult> {
        match self.result_rx.try_recv() {
            Ok(result) => Some(self.finish(result)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.worker_gone();
                None
            }
        }
    }

    /// Like [`ScanScheduler::poll_result`] but waits up to `timeout` for the
    /// running scan to finish
    pub fn wait_result(&self, timeout: Duration) -> Option<ScanResult> {
        if self.state.lock().current.is_none() {
            return None;
        }

        match self.result_rx.recv_timeout(timeout) {
            Ok(result) => Some(self.finish(result)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                self.worker_gone();
                None
            }
        }
    }

    /// The directory that is currently being scanned, or whose result is
    /// waiting to be collected
    pub fn currently_scanning(&self) -> Option<PathBuf> {
        self.state.lock().current.clone()
    }

    /// Number of queued scans that have not started yet
    pub fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// True when nothing is running and nothing is queued
    pub fn is_idle(&self) -> bool {
        let state = self.state.lock();
        state.current.is_none() && state.pending.is_empty()
    }

    /// True when scans are queued but none can be dispatched because the
    /// worker thread has stopped. Waiting on such a scheduler never yields.
    pub fn is_stalled(&self) -> bool {
        let state = self.state.lock();
        state.current.is_none() && !state.pending.is_empty()
    }

    fn finish(&self, result: ScanResult) -> ScanResult {
        let mut state = self.state.lock();
        if let Some(path) = state.current.take() {
            match &result {
                Ok(dir) => info!(
                    path = %path.display(),
                    assets = dir.asset_count_recursive(),
                    "Scan finished"
                ),
                Err(err) => error!(error = %err, "Scan failed"),
            }
        }
        self.maybe_start_next(&mut state);
        result
    }

    /// Starts the next scan if no scan is outstanding and something is queued
    fn maybe_start_next(&self, state: &mut SchedulerState) {
        if state.current.is_some() {
            // Busy, or waiting for someone to collect the result
            return;
        }

        let next = match self.order {
            ScanOrder::Fifo => state.pending.pop_front(),
            ScanOrder::Lifo => state.pending.pop_back(),
        };
        let Some(path) = next else {
            return;
        };

        let Some(job_tx) = &self.job_tx else {
            state.pending.push_front(path);
            return;
        };

        match job_tx.send(path.clone()) {
            Ok(()) => {
                debug!(path = %path.display(), "Started scan");
                state.current = Some(path);
            }
            Err(_) => {
                error!(path = %path.display(), "Scan worker is gone, scan stays queued");
                state.pending.push_front(path);
            }
        }
    }

    fn worker_gone(&self) {
        let mut state = self.state.lock();
        if let Some(path) = state.current.take() {
            error!(path = %path.display(), "Scan worker stopped before finishing");
        }
    }
}

impl Drop for ScanScheduler {
    fn drop(&mut self) {
        // Closing the job channel ends the worker loop after the running scan
        self.job_tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Scan worker panicked during shutdown");
            }
        }
    }
}

fn worker_loop(options: ScanOptions, jobs: Receiver<PathBuf>, results: Sender<ScanResult>) {
    for path in jobs {
        let load = AssertUnwindSafe(|| AssetDirectory::load_with(&path, &options));
        let result = panic::catch_unwind(load).unwrap_or_else(|payload| {
            Err(ScanError::Panicked {
                path: path.clone(),
                message: panic_message(payload.as_ref()),
            })
        });

        if results.send(result).is_err() {
            // Scheduler dropped, nobody is listening anymore
            break;
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
