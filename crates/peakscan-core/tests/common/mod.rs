#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::Duration;

use parking_lot::Mutex;

use peakscan_core::frame::{BufferGeometry, ExtractedFrame};
use peakscan_core::pipeline::{DispatchError, FrameHandoff, PipelineEvent, ResultSink};

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Geometry with one volume of `buffers_per_volume` buffers.
pub fn geometry(
    bit_depth: u32,
    samples_per_line: u32,
    lines_per_frame: u32,
    frames_per_buffer: u32,
    buffers_per_volume: u32,
) -> BufferGeometry {
    BufferGeometry {
        bit_depth,
        samples_per_line,
        lines_per_frame,
        frames_per_buffer,
        buffers_per_volume,
    }
}

/// Encode u16 samples in native byte order.
pub fn u16_bytes(values: &[u16]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

/// Encode u32 samples in native byte order.
pub fn u32_bytes(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

/// Build an 8-bit buffer where every sample of frame `f` equals `f`.
pub fn buffer_with_frame_ids(geometry: &BufferGeometry) -> Vec<u8> {
    let per_frame = geometry.samples_per_frame();
    (0..geometry.frames_per_buffer)
        .flat_map(|f| std::iter::repeat(f as u8).take(per_frame))
        .collect()
}

/// Sink that records every notification in order.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().clone()
    }

    pub fn infos(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PipelineEvent::Info(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PipelineEvent::Error(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    pub fn extracted_count(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| matches!(e, PipelineEvent::FrameExtracted(_)))
            .count()
    }

    fn push(&self, event: PipelineEvent) {
        self.events.lock().push(event);
    }
}

impl ResultSink for RecordingSink {
    fn averaged_line(&self, line: &[f64]) {
        self.push(PipelineEvent::AveragedLine(line.to_vec()));
    }

    fn peak_position(&self, peak: Option<usize>) {
        self.push(PipelineEvent::PeakPosition(peak));
    }

    fn info(&self, message: &str) {
        self.push(PipelineEvent::Info(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.push(PipelineEvent::Error(message.to_string()));
    }

    fn frame_range_changed(&self, max_frame: u32) {
        self.push(PipelineEvent::FrameRange(max_frame));
    }

    fn buffer_range_changed(&self, max_buffer: u32) {
        self.push(PipelineEvent::BufferRange(max_buffer));
    }

    fn frame_extracted(&self, frame: &ExtractedFrame) {
        self.push(PipelineEvent::FrameExtracted(frame.clone()));
    }
}

/// Handoff that records dispatched frames and can be forced busy.
#[derive(Default)]
pub struct FakeHandoff {
    busy: AtomicBool,
    pub dispatched: Mutex<Vec<ExtractedFrame>>,
}

impl FakeHandoff {
    pub fn busy() -> Self {
        let handoff = Self::default();
        handoff.set_busy(true);
        handoff
    }

    pub fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::SeqCst);
    }

    pub fn dispatched_count(&self) -> usize {
        self.dispatched.lock().len()
    }
}

impl FrameHandoff for FakeHandoff {
    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    fn try_dispatch(&self, frame: ExtractedFrame) -> Result<(), DispatchError> {
        if self.is_busy() {
            return Err(DispatchError::Busy);
        }
        self.dispatched.lock().push(frame);
        Ok(())
    }
}

/// Wait for the next averaged line and peak from a detector channel,
/// skipping other notifications.
pub fn next_analysis(rx: &mpsc::Receiver<PipelineEvent>) -> (Vec<f64>, Option<usize>) {
    let mut line = None;
    loop {
        match rx.recv_timeout(EVENT_TIMEOUT).expect("analysis result") {
            PipelineEvent::AveragedLine(l) => line = Some(l),
            PipelineEvent::PeakPosition(p) => {
                return (line.expect("averaged line before peak"), p);
            }
            _ => {}
        }
    }
}
