pub mod config;
pub mod convert;
pub mod peak;
pub mod run;

use std::fs::File;
use std::path::Path;

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use memmap2::Mmap;
use peakscan_core::frame::BufferGeometry;
use peakscan_core::params::BufferSource;
use peakscan_core::roi::Roi;

#[derive(Clone, Copy, ValueEnum)]
pub enum SourceArg {
    Raw,
    Processed,
}

impl From<SourceArg> for BufferSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Raw => BufferSource::Raw,
            SourceArg::Processed => BufferSource::Processed,
        }
    }
}

/// Layout of a single raw frame file.
#[derive(Args)]
pub struct FrameLayoutArgs {
    /// Bits per sample (1-32)
    #[arg(long, default_value = "12")]
    pub bit_depth: u32,

    /// Samples per line (frame width)
    #[arg(long)]
    pub width: u32,

    /// Lines per frame (frame height)
    #[arg(long)]
    pub height: u32,

    /// Index of the frame inside the file when it holds several
    #[arg(long, default_value = "0")]
    pub frame: u32,
}

impl FrameLayoutArgs {
    pub fn geometry(&self) -> BufferGeometry {
        BufferGeometry {
            bit_depth: self.bit_depth,
            samples_per_line: self.width,
            lines_per_frame: self.height,
            frames_per_buffer: self.frame + 1,
            buffers_per_volume: 1,
        }
    }
}

/// Parse a ROI given as `x,y,w,h`.
pub fn parse_roi(s: &str) -> std::result::Result<Roi, String> {
    let parts: Vec<i32> = s
        .split(',')
        .map(|p| p.trim().parse::<i32>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|e| format!("invalid ROI '{s}': {e}"))?;
    match parts.as_slice() {
        &[x, y, w, h] => Ok(Roi::new(x, y, w, h)),
        _ => Err(format!("ROI needs four values x,y,w,h, got '{s}'")),
    }
}

/// Memory-map a file read-only.
pub fn map_file(path: &Path) -> Result<Mmap> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mmap = unsafe { Mmap::map(&file) }
        .with_context(|| format!("Failed to map {}", path.display()))?;
    Ok(mmap)
}

/// Copy the selected frame out of a raw frame file.
pub fn read_frame(path: &Path, layout: &FrameLayoutArgs) -> Result<Vec<u8>> {
    let geometry = layout.geometry();
    let range = geometry.frame_byte_range(layout.frame)?;
    let mmap = map_file(path)?;
    if mmap.len() < range.end {
        bail!(
            "{} is too small: frame {} needs {} bytes, file has {}",
            path.display(),
            layout.frame,
            range.end,
            mmap.len()
        );
    }
    Ok(mmap[range].to_vec())
}
