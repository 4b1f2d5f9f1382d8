use ndarray::{s, Array1, ArrayView2};

use crate::error::{PeakScanError, Result};
use crate::frame::{decode_samples, Sample, SampleWidth};
use crate::roi::Roi;

/// Per-column mean intensity over the ROI rows, one value per frame column.
pub type AveragedLine = Vec<f64>;

/// Average the ROI of a raw frame column by column.
///
/// The frame is interpreted as u8, u16 or u32 samples depending on
/// `bit_depth`. The result always has `samples_per_line` entries; columns
/// outside the clamped ROI stay zero, and an ROI that misses the frame
/// yields an all-zero line.
pub fn average_line(
    frame: &[u8],
    bit_depth: u32,
    samples_per_line: u32,
    lines_per_frame: u32,
    roi: &Roi,
) -> Result<AveragedLine> {
    match SampleWidth::from_bit_depth(bit_depth)? {
        SampleWidth::U8 => average_line_typed::<u8>(frame, samples_per_line, lines_per_frame, roi),
        SampleWidth::U16 => {
            average_line_typed::<u16>(frame, samples_per_line, lines_per_frame, roi)
        }
        SampleWidth::U32 => {
            average_line_typed::<u32>(frame, samples_per_line, lines_per_frame, roi)
        }
    }
}

/// Same as [`average_line`] for a fixed sample type.
pub fn average_line_typed<T: Sample>(
    frame: &[u8],
    samples_per_line: u32,
    lines_per_frame: u32,
    roi: &Roi,
) -> Result<AveragedLine> {
    let width = samples_per_line as usize;
    let bytes_per_sample = T::WIDTH.bytes_per_sample();
    let frame_bytes = width
        .checked_mul(lines_per_frame as usize)
        .and_then(|n| n.checked_mul(bytes_per_sample))
        .unwrap_or(usize::MAX);
    if frame.len() < frame_bytes {
        return Err(PeakScanError::BufferTooSmall {
            expected: frame_bytes,
            actual: frame.len(),
        });
    }

    let mut line = vec![0.0; width];
    let clamped = roi.clamp(samples_per_line, lines_per_frame);
    if clamped.is_empty() {
        return Ok(line);
    }

    let x0 = clamped.x as usize;
    let x1 = x0 + clamped.width as usize;
    let y0 = clamped.y as usize;
    let rows = clamped.height as usize;

    // Only the ROI rows are decoded.
    let row_bytes = width * bytes_per_sample;
    let samples = decode_samples::<T>(&frame[y0 * row_bytes..], rows * width)?;
    let view = ArrayView2::from_shape((rows, width), &samples)?;

    let sums = view
        .slice(s![.., x0..x1])
        .rows()
        .into_iter()
        .fold(Array1::<f64>::zeros(x1 - x0), |mut acc, row| {
            acc.zip_mut_with(&row, |sum, &sample| *sum += sample.as_());
            acc
        });

    let divisor = rows as f64;
    for (dst, sum) in line[x0..x1].iter_mut().zip(sums.iter()) {
        *dst = sum / divisor;
    }

    Ok(line)
}
