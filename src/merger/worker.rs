//! Background merge job.
//!
//! Front ends that must stay responsive hand a [`MergeRequest`] to
//! [`MergeJob::spawn`] and poll or drain the returned [`MergeHandle`]. The job
//! emits [`WorkerEvent::Progress`] checkpoints followed by exactly one
//! [`WorkerEvent::Finished`]. There is no cancellation.

use super::{MergeOptions, MergeSummary, Merger, Progress, RenameMode};
use crate::error::{MergeError, Result};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use tracing::{error, info};

/// Everything a background merge needs
#[derive(Debug, Clone)]
pub struct MergeRequest {
    pub inputs: Vec<PathBuf>,
    pub output: PathBuf,
    pub mode: RenameMode,
    pub options: MergeOptions,
}

impl MergeRequest {
    pub fn new(inputs: Vec<PathBuf>, output: impl Into<PathBuf>, mode: RenameMode) -> Self {
        Self {
            inputs,
            output: output.into(),
            mode,
            options: MergeOptions::default(),
        }
    }

    pub fn with_options(mut self, options: MergeOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug)]
pub enum WorkerEvent {
    Progress(Progress),
    Finished(Result<MergeSummary>),
}

pub struct MergeJob;

impl MergeJob {
    /// Run load, conflict detection and merge on a new thread
    pub fn spawn(request: MergeRequest) -> MergeHandle {
        let (tx, rx) = mpsc::channel();
        let thread = thread::spawn(move || {
            let result = run(&request, &tx);
            match &result {
                Ok(summary) => info!(entries = summary.entries, "background merge finished"),
                Err(e) => error!(error = %e, "background merge failed"),
            }
            // Receiver may be gone if the caller stopped listening
            let _ = tx.send(WorkerEvent::Finished(result));
        });

        MergeHandle {
            events: rx,
            thread: Some(thread),
        }
    }
}

fn run(request: &MergeRequest, tx: &Sender<WorkerEvent>) -> Result<MergeSummary> {
    let report = |progress: Progress| {
        let _ = tx.send(WorkerEvent::Progress(progress));
    };

    report(Progress::Loading {
        archives: request.inputs.len(),
    });
    let merger = Merger::new(&request.inputs)?;

    report(Progress::DetectingConflicts);
    let conflicts = merger.detect_conflicts();
    if !conflicts.is_empty() {
        merger.log_conflicts(&conflicts);
        report(Progress::ConflictsFound {
            count: conflicts.len(),
            mode: request.mode,
        });
    }

    merger.merge_with_options(&request.output, request.mode, &request.options, |progress| {
        report(progress.clone())
    })
}

/// Caller's side of a running [`MergeJob`]
pub struct MergeHandle {
    events: Receiver<WorkerEvent>,
    thread: Option<JoinHandle<()>>,
}

impl MergeHandle {
    /// Blocking iterator over events; ends once the worker drops its sender
    /// right after `Finished`
    pub fn events(&self) -> mpsc::Iter<'_, WorkerEvent> {
        self.events.iter()
    }

    /// Next event if one is ready, for polling from an event loop
    pub fn try_recv(&self) -> Option<WorkerEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Block until the job ends, forwarding progress to `on_progress`
    pub fn wait<F>(mut self, mut on_progress: F) -> Result<MergeSummary>
    where
        F: FnMut(&Progress),
    {
        let outcome = loop {
            match self.events.recv() {
                Ok(WorkerEvent::Progress(progress)) => on_progress(&progress),
                Ok(WorkerEvent::Finished(result)) => break Some(result),
                Err(_) => break None,
            }
        };

        let joined = self.join();
        match outcome {
            Some(result) => result,
            None => Err(joined
                .err()
                .unwrap_or_else(|| MergeError::Worker("worker exited without a result".into()))),
        }
    }

    /// Wait for the worker thread itself to exit
    pub fn join(&mut self) -> Result<()> {
        match self.thread.take() {
            Some(thread) => thread
                .join()
                .map_err(|_| MergeError::Worker("merge thread panicked".into())),
            None => Ok(()),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.thread
            .as_ref()
            .map(|thread| thread.is_finished())
            .unwrap_or(true)
    }
}
