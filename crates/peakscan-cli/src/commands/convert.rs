use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use image::{GrayImage, ImageFormat};
use peakscan_core::convert::{convert_to_8bit, Converted8Bit};

use super::{read_frame, FrameLayoutArgs};

#[derive(Args)]
pub struct ConvertArgs {
    /// Raw frame file (native-endian samples)
    pub file: PathBuf,

    #[command(flatten)]
    pub layout: FrameLayoutArgs,

    /// Output PNG path
    #[arg(short, long, default_value = "frame.png")]
    pub output: PathBuf,
}

pub fn run(args: &ConvertArgs) -> Result<()> {
    let raw = read_frame(&args.file, &args.layout)?;
    let converted = convert_to_8bit(&raw, args.layout.bit_depth, args.layout.width, args.layout.height)?;
    save_png(&converted, &args.output)?;

    println!(
        "Converted {}x{} frame ({} bit) to {}",
        converted.width,
        converted.height,
        args.layout.bit_depth,
        args.output.display()
    );
    Ok(())
}

/// Save an 8-bit frame as grayscale PNG.
pub fn save_png(frame: &Converted8Bit, path: &Path) -> Result<()> {
    let img = GrayImage::from_raw(frame.width, frame.height, frame.data.clone())
        .context("Converted frame does not match its dimensions")?;
    img.save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
