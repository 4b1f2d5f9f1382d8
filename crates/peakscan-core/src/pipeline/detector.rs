use std::sync::Arc;

use tracing::info;

use crate::error::Result;
use crate::frame::BufferGeometry;
use crate::params::{BufferSource, ParameterStore, Parameters};
use crate::roi::Roi;

use super::dispatcher::{AnalysisDispatcher, FrameHandoff};
use super::extractor::{ExtractOutcome, FrameExtractor};
use super::sink::ResultSink;

/// Entry point for an acquisition host: receives raw and processed
/// buffers, extracts the selected frame and analyses it in the background.
pub struct PeakDetector {
    params: ParameterStore,
    sink: Arc<dyn ResultSink>,
    dispatcher: AnalysisDispatcher,
    raw: FrameExtractor,
    processed: FrameExtractor,
    enabled: bool,
}

impl PeakDetector {
    /// Spawn the analysis worker. The detector starts disabled, like a host
    /// extension that has not been activated yet.
    pub fn new(params: Parameters, sink: Arc<dyn ResultSink>) -> Result<Self> {
        let store = ParameterStore::new(params);
        let dispatcher = AnalysisDispatcher::spawn(store.clone(), Arc::clone(&sink))?;
        Ok(Self {
            params: store,
            sink,
            dispatcher,
            raw: FrameExtractor::new(BufferSource::Raw),
            processed: FrameExtractor::new(BufferSource::Processed),
            enabled: false,
        })
    }

    /// Shared parameter record; clone it into the control context.
    pub fn parameters(&self) -> &ParameterStore {
        &self.params
    }

    pub fn set_parameters(&self, params: Parameters) {
        self.params.replace(params);
    }

    /// Replace the ROI and announce it.
    pub fn set_roi(&self, roi: Roi) {
        self.params.update(|p| p.roi = roi);
        self.sink.info(&format!("ROI: {roi}"));
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            info!(enabled, "Peak detector toggled");
        }
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Analyse only every `n`th eligible buffer of either source.
    pub fn set_decimation(&mut self, n: u32) {
        self.raw.set_decimation(n);
        self.processed.set_decimation(n);
    }

    /// Host gate for grabbing buffers of `source`; closed gates count
    /// arriving buffers as lost.
    pub fn set_grabbing_allowed(&mut self, source: BufferSource, allowed: bool) {
        self.extractor_mut(source).set_grabbing_allowed(allowed);
    }

    pub fn lost_buffers(&self, source: BufferSource) -> u32 {
        self.extractor(source).lost_buffers()
    }

    pub fn is_busy(&self) -> bool {
        self.dispatcher.is_busy()
    }

    pub fn extractor(&self, source: BufferSource) -> &FrameExtractor {
        match source {
            BufferSource::Raw => &self.raw,
            BufferSource::Processed => &self.processed,
        }
    }

    fn extractor_mut(&mut self, source: BufferSource) -> &mut FrameExtractor {
        match source {
            BufferSource::Raw => &mut self.raw,
            BufferSource::Processed => &mut self.processed,
        }
    }

    pub fn raw_data_received(
        &mut self,
        buffer: &[u8],
        geometry: &BufferGeometry,
        current_buffer_nr: u32,
    ) -> ExtractOutcome {
        self.data_received(BufferSource::Raw, buffer, geometry, current_buffer_nr)
    }

    pub fn processed_data_received(
        &mut self,
        buffer: &[u8],
        geometry: &BufferGeometry,
        current_buffer_nr: u32,
    ) -> ExtractOutcome {
        self.data_received(BufferSource::Processed, buffer, geometry, current_buffer_nr)
    }

    fn data_received(
        &mut self,
        source: BufferSource,
        buffer: &[u8],
        geometry: &BufferGeometry,
        current_buffer_nr: u32,
    ) -> ExtractOutcome {
        if !self.enabled {
            return ExtractOutcome::Ignored;
        }
        let params = self.params.snapshot();
        if params.buffer_source != source {
            return ExtractOutcome::Ignored;
        }

        let extractor = match source {
            BufferSource::Raw => &mut self.raw,
            BufferSource::Processed => &mut self.processed,
        };
        extractor.on_buffer(
            buffer,
            geometry,
            current_buffer_nr,
            &params,
            &self.dispatcher,
            self.sink.as_ref(),
        )
    }

    /// Stop the worker after its in-flight frame, then free both pools.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        self.dispatcher.shutdown();
        self.raw.release();
        self.processed.release();
    }
}

impl Drop for PeakDetector {
    fn drop(&mut self) {
        self.stop();
    }
}
