use thiserror::Error;

#[derive(Error, Debug)]
pub enum PeakScanError {
    #[error("Invalid data dimensions: bit depth {bit_depth}, {samples_per_line} samples/line, {lines_per_frame} lines/frame, {frames_per_buffer} frames/buffer")]
    InvalidGeometry {
        bit_depth: u32,
        samples_per_line: u32,
        lines_per_frame: u32,
        frames_per_buffer: u32,
    },

    #[error("Invalid image: bit depth {bit_depth}, {width}x{height}")]
    InvalidDimensions {
        bit_depth: u32,
        width: u32,
        height: u32,
    },

    #[error("Unsupported bit depth: {0} (supported: 1-32)")]
    UnsupportedBitDepth(u32),

    #[error("Buffer too small: expected at least {expected} bytes, got {actual}")]
    BufferTooSmall { expected: usize, actual: usize },

    #[error("Frame shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Invalid setting '{key}': {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("Unknown {kind} value: {value}")]
    UnknownVariant { kind: &'static str, value: i64 },

    #[error("Failed to spawn analysis worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PeakScanError>;
