use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use peakscan_core::frame::ExtractedFrame;
use peakscan_core::params::BufferSource;
use peakscan_core::pipeline::{ChannelSink, ExtractOutcome, PeakDetector, PipelineEvent};
use peakscan_core::roi::Roi;
use tracing::warn;

use super::convert::save_png;
use super::{map_file, parse_roi, SourceArg};
use crate::config::RunConfig;
use crate::summary::print_run_summary;

#[derive(Args)]
pub struct RunArgs {
    /// Acquisition dump: consecutive buffers of native-endian samples
    pub file: PathBuf,

    /// Run config file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Stream the dump was recorded from
    #[arg(long, value_enum)]
    pub source: Option<SourceArg>,

    /// Analyse every Nth selected buffer
    #[arg(long)]
    pub decimation: Option<u32>,

    /// Frame inside each buffer
    #[arg(long)]
    pub frame: Option<i32>,

    /// Buffer inside the volume, -1 for all
    #[arg(long, allow_hyphen_values = true)]
    pub buffer: Option<i32>,

    /// Region of interest as x,y,w,h
    #[arg(long, value_parser = parse_roi, allow_hyphen_values = true)]
    pub roi: Option<Roi>,

    /// Minimum averaged value a peak must exceed
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Wait for each analysis to finish instead of dropping buffers
    #[arg(long)]
    pub wait: bool,

    /// Save the last extracted frame as an 8-bit PNG
    #[arg(long)]
    pub preview: Option<PathBuf>,
}

/// Counts collected while replaying a dump.
#[derive(Debug, Default)]
pub struct RunStats {
    pub buffers: usize,
    pub dispatched: usize,
    pub decimated: usize,
    pub not_selected: usize,
    pub lost: u32,
    pub rejected: usize,
    pub analysed: usize,
    pub peaks_found: usize,
    pub last_peak: Option<usize>,
    pub errors: Vec<String>,
    pub trailing_bytes: usize,
}

impl RunStats {
    fn record_outcome(&mut self, outcome: ExtractOutcome) {
        match outcome {
            ExtractOutcome::Ignored | ExtractOutcome::Lost { .. } => {}
            ExtractOutcome::NotSelected => self.not_selected += 1,
            ExtractOutcome::Decimated => self.decimated += 1,
            ExtractOutcome::Rejected => self.rejected += 1,
            ExtractOutcome::Dispatched { .. } => self.dispatched += 1,
        }
    }

    fn record_event(&mut self, event: PipelineEvent, last_frame: &mut Option<ExtractedFrame>) {
        match event {
            PipelineEvent::PeakPosition(peak) => {
                self.analysed += 1;
                if peak.is_some() {
                    self.peaks_found += 1;
                }
                self.last_peak = peak;
            }
            PipelineEvent::Error(msg) => self.errors.push(msg),
            PipelineEvent::FrameExtracted(frame) => *last_frame = Some(frame),
            _ => {}
        }
    }
}

fn build_config(args: &RunArgs) -> Result<RunConfig> {
    let mut config = match args.config {
        Some(ref path) => RunConfig::load(path)?,
        None => RunConfig::default(),
    };

    if let Some(source) = args.source {
        config.parameters.buffer_source = source.into();
    }
    if let Some(n) = args.decimation {
        config.decimation = n;
    }
    if let Some(frame) = args.frame {
        config.parameters.frame_nr = frame;
    }
    if let Some(buffer) = args.buffer {
        config.parameters.buffer_nr = buffer;
    }
    if let Some(roi) = args.roi {
        config.parameters.roi = roi;
    }
    if let Some(threshold) = args.threshold {
        config.parameters.min_threshold = threshold;
    }
    Ok(config)
}

pub fn run(args: &RunArgs) -> Result<()> {
    let config = build_config(args)?;
    let geometry = config.geometry;
    let bytes_per_buffer = geometry
        .bytes_per_buffer()
        .context("Invalid buffer geometry in run config")?;

    let dump = map_file(&args.file)?;
    let buffer_count = dump.len() / bytes_per_buffer;
    if buffer_count == 0 {
        bail!(
            "{} holds {} bytes, less than one buffer of {} bytes",
            args.file.display(),
            dump.len(),
            bytes_per_buffer
        );
    }

    let mut stats = RunStats {
        buffers: buffer_count,
        trailing_bytes: dump.len() % bytes_per_buffer,
        ..Default::default()
    };
    if stats.trailing_bytes > 0 {
        warn!(bytes = stats.trailing_bytes, "Ignoring incomplete trailing buffer");
    }

    let (tx, rx) = mpsc::channel();
    let sink = ChannelSink::new(tx).with_frames(args.preview.is_some());
    let mut detector = PeakDetector::new(config.parameters, Arc::new(sink))?;
    detector.set_decimation(config.decimation);
    detector.set_enabled(true);

    let source = config.parameters.buffer_source;
    let buffers_per_volume = geometry.buffers_per_volume.max(1) as usize;
    let mut last_frame = None;

    let pb = ProgressBar::new(buffer_count as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg:20} [{bar:40}] {pos}/{len}")?
            .progress_chars("=> "),
    );
    pb.set_message("Replaying");

    for (i, buffer) in dump.chunks_exact(bytes_per_buffer).enumerate() {
        if args.wait {
            while detector.is_busy() {
                std::thread::sleep(Duration::from_micros(100));
            }
        }

        let buffer_nr = (i % buffers_per_volume) as u32;
        let outcome = match source {
            BufferSource::Raw => detector.raw_data_received(buffer, &geometry, buffer_nr),
            BufferSource::Processed => {
                detector.processed_data_received(buffer, &geometry, buffer_nr)
            }
        };
        stats.record_outcome(outcome);

        for event in rx.try_iter() {
            stats.record_event(event, &mut last_frame);
        }
        pb.inc(1);
    }

    stats.lost = detector.lost_buffers(source);
    detector.shutdown();
    for event in rx.iter() {
        stats.record_event(event, &mut last_frame);
    }
    pb.finish_with_message("Done");

    print_run_summary(&args.file, &config, &stats);

    if let Some(ref path) = args.preview {
        match last_frame {
            Some(frame) => {
                let converted = frame.to_8bit()?;
                save_png(&converted, path)?;
                println!("\nPreview saved to {}", path.display());
            }
            None => warn!("No frame was extracted, preview not written"),
        }
    }

    Ok(())
}
