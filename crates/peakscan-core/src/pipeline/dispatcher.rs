use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use thiserror::Error;
use tracing::{debug, warn};

use crate::consts::WORKER_THREAD_NAME;
use crate::error::Result;
use crate::frame::ExtractedFrame;
use crate::params::ParameterStore;

use super::analysis::run_analysis;
use super::sink::ResultSink;

/// Why a frame was not handed to the analysis stage.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    #[error("analysis stage is busy")]
    Busy,
    #[error("analysis stage has stopped")]
    Stopped,
}

/// Producer-side view of the analysis stage.
///
/// At most one frame is in flight: while [`FrameHandoff::is_busy`] reports
/// true, [`FrameHandoff::try_dispatch`] refuses new frames instead of
/// queueing them.
pub trait FrameHandoff {
    fn is_busy(&self) -> bool;

    fn try_dispatch(&self, frame: ExtractedFrame) -> std::result::Result<(), DispatchError>;
}

/// Runs averaging and peak location on a dedicated worker thread, fed
/// through a single-slot channel.
pub struct AnalysisDispatcher {
    tx: Option<Sender<ExtractedFrame>>,
    busy: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl AnalysisDispatcher {
    /// Spawn the worker thread. Each frame is analysed with a fresh snapshot
    /// of `params`.
    pub fn spawn(params: ParameterStore, sink: Arc<dyn ResultSink>) -> Result<Self> {
        let (tx, rx) = crossbeam_channel::bounded::<ExtractedFrame>(1);
        let busy = Arc::new(AtomicBool::new(false));
        let worker_busy = Arc::clone(&busy);

        let worker = std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.into())
            .spawn(move || worker_loop(rx, params, sink, worker_busy))?;

        Ok(Self {
            tx: Some(tx),
            busy,
            worker: Some(worker),
        })
    }

    /// Close the channel, let the in-flight frame finish and join the worker.
    pub fn shutdown(&mut self) {
        drop(self.tx.take());
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Analysis worker panicked");
            }
        }
    }
}

impl FrameHandoff for AnalysisDispatcher {
    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn try_dispatch(&self, frame: ExtractedFrame) -> std::result::Result<(), DispatchError> {
        let tx = self.tx.as_ref().ok_or(DispatchError::Stopped)?;

        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(DispatchError::Busy);
        }

        match tx.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.busy.store(false, Ordering::Release);
                Err(DispatchError::Busy)
            }
            Err(TrySendError::Disconnected(_)) => {
                self.busy.store(false, Ordering::Release);
                Err(DispatchError::Stopped)
            }
        }
    }
}

impl Drop for AnalysisDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Clears the busy flag when a cycle ends, even if the sink panics.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn worker_loop(
    rx: Receiver<ExtractedFrame>,
    params: ParameterStore,
    sink: Arc<dyn ResultSink>,
    busy: Arc<AtomicBool>,
) {
    while let Ok(frame) = rx.recv() {
        let _guard = BusyGuard(&busy);
        let snapshot = params.snapshot();
        run_analysis(&frame, &snapshot, sink.as_ref());
        // Release the slot before the producer may claim the stage again.
        drop(frame);
    }
    debug!("Analysis worker stopped");
}
