use tracing::{debug, warn};

use crate::averaging::{average_line, AveragedLine};
use crate::error::Result;
use crate::frame::ExtractedFrame;
use crate::params::Parameters;

use super::sink::ResultSink;

/// Result of one averaging + peak-finding pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Analysis {
    pub line: AveragedLine,
    pub peak: Option<usize>,
}

/// Average the configured ROI of a raw frame and locate its peak.
pub fn analyze(
    frame: &[u8],
    bit_depth: u32,
    samples_per_line: u32,
    lines_per_frame: u32,
    params: &Parameters,
) -> Result<Analysis> {
    let line = average_line(frame, bit_depth, samples_per_line, lines_per_frame, &params.roi)?;
    let peak = params.feature.locate(&line, params.min_threshold);
    Ok(Analysis { line, peak })
}

/// Analyse an extracted frame and report the outcome to `sink`.
///
/// Errors are reported through [`ResultSink::error`]; nothing else is
/// emitted for that frame.
pub fn run_analysis(
    frame: &ExtractedFrame,
    params: &Parameters,
    sink: &dyn ResultSink,
) -> Option<Analysis> {
    match analyze(
        frame.bytes(),
        frame.bit_depth,
        frame.samples_per_line,
        frame.lines_per_frame,
        params,
    ) {
        Ok(analysis) => {
            debug!(
                slot = frame.slot,
                buffer = frame.buffer_nr,
                frame = frame.frame_index,
                peak = ?analysis.peak,
                "Frame analysed"
            );
            sink.averaged_line(&analysis.line);
            sink.peak_position(analysis.peak);
            Some(analysis)
        }
        Err(e) => {
            warn!(error = %e, "Frame analysis failed");
            sink.error(&format!("Peak detection failed: {e}"));
            None
        }
    }
}
