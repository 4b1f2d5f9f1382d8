use std::ops::Range;
use std::sync::Arc;

use byteorder::{ByteOrder, NativeEndian};
use num_traits::{AsPrimitive, PrimInt, Unsigned};
use serde::{Deserialize, Serialize};

use crate::consts::MAX_BIT_DEPTH;
use crate::convert::{convert_to_8bit, Converted8Bit};
use crate::error::{PeakScanError, Result};

/// Storage unit backing the samples of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleWidth {
    U8,
    U16,
    U32,
}

impl SampleWidth {
    /// Pick the storage unit for a bit depth: 1-8 -> u8, 9-16 -> u16, 17-32 -> u32.
    pub fn from_bit_depth(bit_depth: u32) -> Result<Self> {
        match bit_depth {
            1..=8 => Ok(Self::U8),
            9..=16 => Ok(Self::U16),
            17..=MAX_BIT_DEPTH => Ok(Self::U32),
            _ => Err(PeakScanError::UnsupportedBitDepth(bit_depth)),
        }
    }

    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
        }
    }
}

/// An unsigned sample type that raw frame memory can be decoded into.
pub trait Sample: PrimInt + Unsigned + AsPrimitive<f64> + Send + Sync + 'static {
    const WIDTH: SampleWidth;

    /// Decode `out.len()` native-endian samples from `raw`.
    /// `raw.len()` must equal `out.len() * size_of::<Self>()`.
    fn decode_into(raw: &[u8], out: &mut [Self]);
}

impl Sample for u8 {
    const WIDTH: SampleWidth = SampleWidth::U8;

    fn decode_into(raw: &[u8], out: &mut [Self]) {
        out.copy_from_slice(raw);
    }
}

impl Sample for u16 {
    const WIDTH: SampleWidth = SampleWidth::U16;

    fn decode_into(raw: &[u8], out: &mut [Self]) {
        NativeEndian::read_u16_into(raw, out);
    }
}

impl Sample for u32 {
    const WIDTH: SampleWidth = SampleWidth::U32;

    fn decode_into(raw: &[u8], out: &mut [Self]) {
        NativeEndian::read_u32_into(raw, out);
    }
}

/// Decode the first `count` samples of a raw buffer.
pub fn decode_samples<T: Sample>(raw: &[u8], count: usize) -> Result<Vec<T>> {
    let needed = count
        .checked_mul(T::WIDTH.bytes_per_sample())
        .ok_or(PeakScanError::BufferTooSmall {
            expected: usize::MAX,
            actual: raw.len(),
        })?;
    if raw.len() < needed {
        return Err(PeakScanError::BufferTooSmall {
            expected: needed,
            actual: raw.len(),
        });
    }
    let mut out = vec![T::zero(); count];
    T::decode_into(&raw[..needed], &mut out);
    Ok(out)
}

/// Shape metadata delivered with every acquisition buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferGeometry {
    pub bit_depth: u32,
    pub samples_per_line: u32,
    pub lines_per_frame: u32,
    pub frames_per_buffer: u32,
    pub buffers_per_volume: u32,
}

impl BufferGeometry {
    /// Reject zero-sized dimensions and unsupported bit depths.
    pub fn validate(&self) -> Result<SampleWidth> {
        if self.bit_depth == 0
            || self.samples_per_line == 0
            || self.lines_per_frame == 0
            || self.frames_per_buffer == 0
        {
            return Err(self.invalid());
        }
        SampleWidth::from_bit_depth(self.bit_depth)
    }

    fn invalid(&self) -> PeakScanError {
        PeakScanError::InvalidGeometry {
            bit_depth: self.bit_depth,
            samples_per_line: self.samples_per_line,
            lines_per_frame: self.lines_per_frame,
            frames_per_buffer: self.frames_per_buffer,
        }
    }

    pub fn samples_per_frame(&self) -> usize {
        (self.samples_per_line as usize).saturating_mul(self.lines_per_frame as usize)
    }

    /// Size of one frame in bytes, using the storage unit of the bit depth.
    ///
    /// 17-24 bit data is expected in 32-bit words, not packed 3-byte samples.
    /// Dimensions whose byte size does not fit in `usize` are invalid.
    pub fn bytes_per_frame(&self) -> Result<usize> {
        let width = self.validate()?;
        (self.samples_per_line as usize)
            .checked_mul(self.lines_per_frame as usize)
            .and_then(|n| n.checked_mul(width.bytes_per_sample()))
            .ok_or_else(|| self.invalid())
    }

    /// Total size of one delivered buffer in bytes.
    pub fn bytes_per_buffer(&self) -> Result<usize> {
        self.bytes_per_frame()?
            .checked_mul(self.frames_per_buffer as usize)
            .ok_or_else(|| self.invalid())
    }

    /// Clamp a frame selector into `[0, frames_per_buffer - 1]`.
    pub fn clamp_frame_index(&self, frame_index: i32) -> u32 {
        let last = self.frames_per_buffer.saturating_sub(1);
        frame_index.clamp(0, last.min(i32::MAX as u32) as i32) as u32
    }

    /// Clamp a buffer selector into `[-1, buffers_per_volume - 1]`.
    pub fn clamp_buffer_index(&self, buffer_index: i32) -> i32 {
        let last = i64::from(self.buffers_per_volume) - 1;
        i64::from(buffer_index).clamp(-1, last.max(-1)) as i32
    }

    /// Byte range of frame `frame_index` inside a buffer.
    pub fn frame_byte_range(&self, frame_index: u32) -> Result<Range<usize>> {
        let bytes_per_frame = self.bytes_per_frame()?;
        let start = bytes_per_frame
            .checked_mul(frame_index as usize)
            .ok_or_else(|| self.invalid())?;
        let end = start
            .checked_add(bytes_per_frame)
            .ok_or_else(|| self.invalid())?;
        Ok(start..end)
    }
}

/// A single frame copied out of an acquisition buffer.
///
/// The sample memory is shared immutably with the analysis stage; the
/// extractor copies on write if it still holds a slot the worker reads.
#[derive(Clone, Debug)]
pub struct ExtractedFrame {
    pub data: Arc<Vec<u8>>,
    pub bit_depth: u32,
    pub samples_per_line: u32,
    pub lines_per_frame: u32,
    /// Frame index inside the source buffer.
    pub frame_index: u32,
    /// Buffer number inside the volume the frame came from.
    pub buffer_nr: u32,
    /// Pool slot the frame was copied into.
    pub slot: usize,
}

impl ExtractedFrame {
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> usize {
        self.samples_per_line as usize
    }

    pub fn height(&self) -> usize {
        self.lines_per_frame as usize
    }

    /// Rescale the frame to 8 bits for display.
    pub fn to_8bit(&self) -> Result<Converted8Bit> {
        convert_to_8bit(
            self.bytes(),
            self.bit_depth,
            self.samples_per_line,
            self.lines_per_frame,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(bit_depth: u32) -> BufferGeometry {
        BufferGeometry {
            bit_depth,
            samples_per_line: 4,
            lines_per_frame: 3,
            frames_per_buffer: 5,
            buffers_per_volume: 2,
        }
    }

    #[test]
    fn test_sample_width_boundaries() {
        assert_eq!(SampleWidth::from_bit_depth(1).unwrap(), SampleWidth::U8);
        assert_eq!(SampleWidth::from_bit_depth(8).unwrap(), SampleWidth::U8);
        assert_eq!(SampleWidth::from_bit_depth(9).unwrap(), SampleWidth::U16);
        assert_eq!(SampleWidth::from_bit_depth(16).unwrap(), SampleWidth::U16);
        assert_eq!(SampleWidth::from_bit_depth(17).unwrap(), SampleWidth::U32);
        assert_eq!(SampleWidth::from_bit_depth(32).unwrap(), SampleWidth::U32);
        assert!(SampleWidth::from_bit_depth(0).is_err());
        assert!(SampleWidth::from_bit_depth(33).is_err());
    }

    #[test]
    fn test_bytes_per_frame() {
        assert_eq!(geometry(8).bytes_per_frame().unwrap(), 12);
        assert_eq!(geometry(12).bytes_per_frame().unwrap(), 24);
        assert_eq!(geometry(24).bytes_per_frame().unwrap(), 48);
        assert_eq!(geometry(32).bytes_per_frame().unwrap(), 48);
        assert_eq!(geometry(12).bytes_per_buffer().unwrap(), 120);
    }

    #[test]
    fn test_clamp_selectors() {
        let g = geometry(8);
        assert_eq!(g.clamp_frame_index(-3), 0);
        assert_eq!(g.clamp_frame_index(2), 2);
        assert_eq!(g.clamp_frame_index(99), 4);
        assert_eq!(g.clamp_buffer_index(-1), -1);
        assert_eq!(g.clamp_buffer_index(-7), -1);
        assert_eq!(g.clamp_buffer_index(1), 1);
        assert_eq!(g.clamp_buffer_index(5), 1);
    }

    #[test]
    fn test_oversized_geometry_is_invalid() {
        let g = BufferGeometry {
            bit_depth: 32,
            samples_per_line: u32::MAX,
            lines_per_frame: u32::MAX,
            frames_per_buffer: 2,
            buffers_per_volume: 1,
        };
        assert!(matches!(g.bytes_per_frame(), Err(PeakScanError::InvalidGeometry { .. })));
        assert!(g.bytes_per_buffer().is_err());
        assert!(g.frame_byte_range(1).is_err());
    }

    #[test]
    fn test_decode_u16_native() {
        let values = [1u16, 300, 65535];
        let raw: Vec<u8> = values.iter().flat_map(|v| v.to_ne_bytes()).collect();
        let decoded: Vec<u16> = decode_samples(&raw, 3).unwrap();
        assert_eq!(decoded, values);
    }

    #[test]
    fn test_decode_short_buffer() {
        let raw = [0u8; 5];
        assert!(decode_samples::<u32>(&raw, 2).is_err());
    }
}
