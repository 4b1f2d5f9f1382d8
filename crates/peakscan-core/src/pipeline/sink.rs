use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use tracing::debug;

use crate::frame::ExtractedFrame;

/// Receiver of everything the detector produces.
///
/// Called from both the producer context (extraction notifications) and the
/// analysis worker (averaged line, peak). All methods default to no-ops.
pub trait ResultSink: Send + Sync {
    /// Averaged line of the last analysed frame.
    fn averaged_line(&self, _line: &[f64]) {}

    /// Peak index of the last analysed frame, `None` when nothing qualified.
    fn peak_position(&self, _peak: Option<usize>) {}

    fn info(&self, _message: &str) {}

    fn error(&self, _message: &str) {}

    /// Highest valid frame selector changed (frames per buffer - 1).
    fn frame_range_changed(&self, _max_frame: u32) {}

    /// Highest valid buffer selector changed (buffers per volume - 1).
    fn buffer_range_changed(&self, _max_buffer: u32) {}

    /// A frame was copied out of the acquisition buffer and accepted by the
    /// analysis stage.
    fn frame_extracted(&self, _frame: &ExtractedFrame) {}
}

/// Sink that discards everything.
pub struct NoOpSink;

impl ResultSink for NoOpSink {}

/// One notification of the detector, as forwarded by [`ChannelSink`].
#[derive(Clone, Debug)]
pub enum PipelineEvent {
    AveragedLine(Vec<f64>),
    PeakPosition(Option<usize>),
    Info(String),
    Error(String),
    FrameRange(u32),
    BufferRange(u32),
    FrameExtracted(ExtractedFrame),
}

/// Sink that forwards notifications over an mpsc channel to a control thread.
///
/// Extracted frames are only forwarded when enabled, since each forwarded
/// frame keeps its pool slot referenced until the receiver drops it.
pub struct ChannelSink {
    tx: mpsc::Sender<PipelineEvent>,
    forward_frames: bool,
    disconnected: AtomicBool,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<PipelineEvent>) -> Self {
        Self {
            tx,
            forward_frames: false,
            disconnected: AtomicBool::new(false),
        }
    }

    pub fn with_frames(mut self, forward_frames: bool) -> Self {
        self.forward_frames = forward_frames;
        self
    }

    /// True once a send found the receiver gone.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::Relaxed)
    }

    fn send(&self, event: PipelineEvent) {
        if self.tx.send(event).is_err() && !self.disconnected.swap(true, Ordering::Relaxed) {
            debug!("Pipeline event receiver dropped, discarding further events");
        }
    }
}

impl ResultSink for ChannelSink {
    fn averaged_line(&self, line: &[f64]) {
        self.send(PipelineEvent::AveragedLine(line.to_vec()));
    }

    fn peak_position(&self, peak: Option<usize>) {
        self.send(PipelineEvent::PeakPosition(peak));
    }

    fn info(&self, message: &str) {
        self.send(PipelineEvent::Info(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.send(PipelineEvent::Error(message.to_string()));
    }

    fn frame_range_changed(&self, max_frame: u32) {
        self.send(PipelineEvent::FrameRange(max_frame));
    }

    fn buffer_range_changed(&self, max_buffer: u32) {
        self.send(PipelineEvent::BufferRange(max_buffer));
    }

    fn frame_extracted(&self, frame: &ExtractedFrame) {
        if self.forward_frames {
            self.send(PipelineEvent::FrameExtracted(frame.clone()));
        }
    }
}
