use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use peakscan_core::params::Parameters;
use peakscan_core::pipeline::analyze;
use peakscan_core::roi::Roi;

use super::{parse_roi, read_frame, FrameLayoutArgs};
use crate::summary::print_peak_summary;

#[derive(Args)]
pub struct PeakArgs {
    /// Raw frame file (native-endian samples)
    pub file: PathBuf,

    #[command(flatten)]
    pub layout: FrameLayoutArgs,

    /// Region of interest as x,y,w,h
    #[arg(long, value_parser = parse_roi, allow_hyphen_values = true)]
    pub roi: Option<Roi>,

    /// Minimum averaged value a peak must exceed
    #[arg(long, default_value = "0")]
    pub threshold: f64,
}

/// ROI covering the whole frame. Dimensions past `i32::MAX` saturate.
fn full_frame_roi(width: u32, height: u32) -> Roi {
    Roi::new(
        0,
        0,
        i32::try_from(width).unwrap_or(i32::MAX),
        i32::try_from(height).unwrap_or(i32::MAX),
    )
}

pub fn run(args: &PeakArgs) -> Result<()> {
    let raw = read_frame(&args.file, &args.layout)?;
    let params = Parameters {
        roi: args
            .roi
            .unwrap_or_else(|| full_frame_roi(args.layout.width, args.layout.height)),
        min_threshold: args.threshold,
        ..Default::default()
    };

    let analysis = analyze(
        &raw,
        args.layout.bit_depth,
        args.layout.width,
        args.layout.height,
        &params,
    )?;

    print_peak_summary(&params, &analysis);
    Ok(())
}
