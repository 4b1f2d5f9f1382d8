use rayon::prelude::*;

use crate::consts::PARALLEL_SAMPLE_THRESHOLD;
use crate::error::{PeakScanError, Result};
use crate::frame::{decode_samples, Sample, SampleWidth};

/// An 8-bit grayscale image ready for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Converted8Bit {
    /// Row-major pixels, `width * height` bytes.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Rescale `width * height` samples of `bit_depth` bits to 8 bits.
///
/// Each sample `s` maps to `round(s * 255 / (2^bit_depth - 1))`.
pub fn convert_to_8bit(
    buffer: &[u8],
    bit_depth: u32,
    width: u32,
    height: u32,
) -> Result<Converted8Bit> {
    if bit_depth == 0 || width == 0 || height == 0 {
        return Err(PeakScanError::InvalidDimensions {
            bit_depth,
            width,
            height,
        });
    }

    let sample_width = SampleWidth::from_bit_depth(bit_depth)?;
    let count = (width as usize)
        .checked_mul(height as usize)
        .ok_or(PeakScanError::InvalidDimensions {
            bit_depth,
            width,
            height,
        })?;
    let factor = scale_factor(bit_depth);
    let data = match sample_width {
        SampleWidth::U8 => rescale::<u8>(buffer, count, factor)?,
        SampleWidth::U16 => rescale::<u16>(buffer, count, factor)?,
        SampleWidth::U32 => rescale::<u32>(buffer, count, factor)?,
    };

    Ok(Converted8Bit {
        data,
        width,
        height,
    })
}

/// `255 / (2^bit_depth - 1)`.
pub fn scale_factor(bit_depth: u32) -> f64 {
    255.0 / ((1u64 << bit_depth) - 1) as f64
}

fn rescale<T: Sample>(buffer: &[u8], count: usize, factor: f64) -> Result<Vec<u8>> {
    let samples = decode_samples::<T>(buffer, count)?;
    let to_byte = |&s: &T| (s.as_() * factor).round() as u8;

    let data = if count >= PARALLEL_SAMPLE_THRESHOLD {
        samples.par_iter().map(to_byte).collect()
    } else {
        samples.iter().map(to_byte).collect()
    };
    Ok(data)
}
