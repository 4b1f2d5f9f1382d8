use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::consts::{ALL_BUFFERS, DEFAULT_DECIMATION, FRAME_POOL_SLOTS};
use crate::frame::{BufferGeometry, ExtractedFrame};
use crate::params::{BufferSource, Parameters};

use super::dispatcher::{DispatchError, FrameHandoff};
use super::sink::ResultSink;

/// What happened to a delivered buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExtractOutcome {
    /// Detector disabled or a different source selected.
    Ignored,
    /// Buffer number does not match the buffer selector.
    NotSelected,
    /// Skipped by decimation.
    Decimated,
    /// Dropped because the analysis stage was busy or grabbing was closed.
    Lost { total: u32 },
    /// Invalid geometry or a short buffer; reported as an error.
    Rejected,
    /// Copied into `slot` and handed to the analysis stage.
    Dispatched { slot: usize },
}

/// Running count of dropped buffers that wraps to zero at `limit`.
#[derive(Clone, Copy, Debug)]
pub struct LostCounter {
    count: u32,
    limit: u32,
}

/// One increment of a [`LostCounter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LostRecord {
    /// Count after the increment, before any wrap.
    pub total: u32,
    /// The counter reached its limit and was reset to zero.
    pub wrapped: bool,
}

impl Default for LostCounter {
    fn default() -> Self {
        Self::with_limit(u32::MAX)
    }
}

impl LostCounter {
    pub fn with_limit(limit: u32) -> Self {
        Self {
            count: 0,
            limit: limit.max(1),
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn record(&mut self) -> LostRecord {
        self.count += 1;
        let total = self.count;
        let wrapped = self.count >= self.limit;
        if wrapped {
            self.count = 0;
        }
        LostRecord { total, wrapped }
    }
}

/// Fixed set of equally sized copy slots, reused round-robin.
#[derive(Debug)]
pub struct FramePool {
    slots: Vec<Arc<Vec<u8>>>,
    slot_count: usize,
    bytes_per_frame: usize,
    cursor: Option<usize>,
}

impl FramePool {
    pub fn new(slot_count: usize) -> Self {
        Self {
            slots: Vec::new(),
            slot_count: slot_count.max(1),
            bytes_per_frame: 0,
            cursor: None,
        }
    }

    pub fn is_allocated(&self) -> bool {
        !self.slots.is_empty()
    }

    pub fn bytes_per_frame(&self) -> usize {
        self.bytes_per_frame
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// (Re)allocate every slot when the frame size changes. Returns true on
    /// reallocation.
    pub fn ensure_size(&mut self, bytes_per_frame: usize) -> bool {
        if self.is_allocated() && self.bytes_per_frame == bytes_per_frame {
            return false;
        }
        self.slots = (0..self.slot_count)
            .map(|_| Arc::new(vec![0u8; bytes_per_frame]))
            .collect();
        self.bytes_per_frame = bytes_per_frame;
        self.cursor = None;
        true
    }

    /// Copy `frame` into the next slot and return the slot index and a
    /// shared handle to it.
    ///
    /// A slot still referenced by a reader is replaced by a fresh allocation
    /// rather than written through.
    pub fn fill_next(&mut self, frame: &[u8]) -> (usize, Arc<Vec<u8>>) {
        let id = self.cursor.map_or(0, |c| (c + 1) % self.slot_count);
        self.cursor = Some(id);

        let slot = &mut self.slots[id];
        match Arc::get_mut(slot) {
            Some(buf) => buf.copy_from_slice(frame),
            None => {
                debug!(slot = id, "Pool slot still in use, allocating a fresh copy");
                *slot = Arc::new(frame.to_vec());
            }
        }
        (id, Arc::clone(slot))
    }

    pub fn release(&mut self) {
        self.slots.clear();
        self.bytes_per_frame = 0;
        self.cursor = None;
    }
}

/// Selects, decimates and copies frames of one buffer source.
#[derive(Debug)]
pub struct FrameExtractor {
    source: BufferSource,
    pool: FramePool,
    decimation: u32,
    buffer_counter: u32,
    lost: LostCounter,
    frames_per_buffer: Option<u32>,
    buffers_per_volume: Option<u32>,
    grabbing_allowed: bool,
}

impl FrameExtractor {
    pub fn new(source: BufferSource) -> Self {
        Self {
            source,
            pool: FramePool::new(FRAME_POOL_SLOTS),
            decimation: DEFAULT_DECIMATION,
            buffer_counter: 0,
            lost: LostCounter::default(),
            frames_per_buffer: None,
            buffers_per_volume: None,
            grabbing_allowed: true,
        }
    }

    pub fn with_lost_counter(mut self, lost: LostCounter) -> Self {
        self.lost = lost;
        self
    }

    pub fn source(&self) -> BufferSource {
        self.source
    }

    pub fn decimation(&self) -> u32 {
        self.decimation
    }

    /// Analyse only every `n`th eligible buffer; 0 is treated as 1.
    pub fn set_decimation(&mut self, n: u32) {
        self.decimation = n.max(1);
        self.buffer_counter = 0;
    }

    pub fn buffer_counter(&self) -> u32 {
        self.buffer_counter
    }

    pub fn lost_buffers(&self) -> u32 {
        self.lost.count()
    }

    pub fn set_grabbing_allowed(&mut self, allowed: bool) {
        self.grabbing_allowed = allowed;
    }

    pub fn pool(&self) -> &FramePool {
        &self.pool
    }

    pub fn release(&mut self) {
        self.pool.release();
    }

    /// Decide what to do with a delivered buffer and, if selected, copy one
    /// frame out of it and hand it to `handoff`.
    pub fn on_buffer(
        &mut self,
        buffer: &[u8],
        geometry: &BufferGeometry,
        current_buffer_nr: u32,
        params: &Parameters,
        handoff: &impl FrameHandoff,
        sink: &dyn ResultSink,
    ) -> ExtractOutcome {
        if !self.grabbing_allowed {
            return self.record_lost(sink);
        }

        let selected = geometry.clamp_buffer_index(params.buffer_nr);
        if selected != ALL_BUFFERS && i64::from(selected) != i64::from(current_buffer_nr) {
            return ExtractOutcome::NotSelected;
        }

        self.buffer_counter += 1;
        if self.buffer_counter < self.decimation {
            return ExtractOutcome::Decimated;
        }
        self.buffer_counter = 0;

        if handoff.is_busy() {
            return self.record_lost(sink);
        }

        let range = match geometry
            .validate()
            .and_then(|_| geometry.frame_byte_range(geometry.clamp_frame_index(params.frame_nr)))
        {
            Ok(range) => range,
            Err(e) => {
                warn!(source = %self.source, error = %e, "Buffer rejected");
                sink.error(&format!("Invalid data dimensions! {e}"));
                return ExtractOutcome::Rejected;
            }
        };
        if buffer.len() < range.end {
            warn!(
                source = %self.source,
                expected = range.end,
                actual = buffer.len(),
                "Buffer shorter than the selected frame"
            );
            sink.error(&format!(
                "Buffer too small: expected at least {} bytes, got {}",
                range.end,
                buffer.len()
            ));
            return ExtractOutcome::Rejected;
        }

        self.notify_ranges(geometry, sink);

        let bytes_per_frame = range.len();
        if self.pool.ensure_size(bytes_per_frame) {
            info!(
                source = %self.source,
                bytes_per_frame,
                slots = self.pool.slot_count(),
                "Frame pool allocated"
            );
        }

        let frame_index = geometry.clamp_frame_index(params.frame_nr);
        let (slot, data) = self.pool.fill_next(&buffer[range]);
        let frame = ExtractedFrame {
            data,
            bit_depth: geometry.bit_depth,
            samples_per_line: geometry.samples_per_line,
            lines_per_frame: geometry.lines_per_frame,
            frame_index,
            buffer_nr: current_buffer_nr,
            slot,
        };

        // Only frames that reach the analysis stage are shown.
        let extracted = frame.clone();
        match handoff.try_dispatch(frame) {
            Ok(()) => {
                sink.frame_extracted(&extracted);
                ExtractOutcome::Dispatched { slot }
            }
            Err(DispatchError::Busy) => self.record_lost(sink),
            Err(DispatchError::Stopped) => {
                sink.error("Analysis stage has stopped");
                ExtractOutcome::Rejected
            }
        }
    }

    fn notify_ranges(&mut self, geometry: &BufferGeometry, sink: &dyn ResultSink) {
        if self.frames_per_buffer != Some(geometry.frames_per_buffer) {
            self.frames_per_buffer = Some(geometry.frames_per_buffer);
            let max_frame = geometry.frames_per_buffer - 1;
            info!(source = %self.source, max_frame, "Frame range changed");
            sink.frame_range_changed(max_frame);
        }
        if self.buffers_per_volume != Some(geometry.buffers_per_volume) {
            self.buffers_per_volume = Some(geometry.buffers_per_volume);
            let max_buffer = geometry.buffers_per_volume.saturating_sub(1);
            info!(source = %self.source, max_buffer, "Buffer range changed");
            sink.buffer_range_changed(max_buffer);
        }
    }

    fn record_lost(&mut self, sink: &dyn ResultSink) -> ExtractOutcome {
        let record = self.lost.record();
        sink.info(&format!(
            "{} buffer lost. Total lost buffers: {}",
            capitalized(self.source),
            record.total
        ));
        if record.wrapped {
            warn!(source = %self.source, "Lost buffer counter overflow");
            sink.info(&format!(
                "Lost {} buffer counter overflow. Counter set to zero.",
                self.source
            ));
        }
        ExtractOutcome::Lost {
            total: record.total,
        }
    }
}

fn capitalized(source: BufferSource) -> &'static str {
    match source {
        BufferSource::Raw => "Raw",
        BufferSource::Processed => "Processed",
    }
}
