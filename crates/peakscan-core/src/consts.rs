/// Number of rotating copy slots per buffer source.
pub const FRAME_POOL_SLOTS: usize = 2;

/// Default decimation divisor: only every Nth eligible buffer is analysed.
pub const DEFAULT_DECIMATION: u32 = 10;

/// Buffer selector value meaning "every buffer of the volume".
pub const ALL_BUFFERS: i32 = -1;

/// Default region of interest as (x, y, width, height).
pub const DEFAULT_ROI: (i32, i32, i32, i32) = (50, 50, 400, 800);

/// Largest bit depth that maps onto a supported storage unit (u32).
pub const MAX_BIT_DEPTH: u32 = 32;

/// Minimum sample count (width*height) to use Rayon parallelism in the
/// 8-bit display conversion.
pub const PARALLEL_SAMPLE_THRESHOLD: usize = 65_536;

/// Thread name of the analysis worker.
pub const WORKER_THREAD_NAME: &str = "peakscan-analysis";
