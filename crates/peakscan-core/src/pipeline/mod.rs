mod analysis;
mod detector;
mod dispatcher;
mod extractor;
mod sink;

pub use analysis::{analyze, run_analysis, Analysis};
pub use detector::PeakDetector;
pub use dispatcher::{AnalysisDispatcher, DispatchError, FrameHandoff};
pub use extractor::{ExtractOutcome, FrameExtractor, FramePool, LostCounter, LostRecord};
pub use sink::{ChannelSink, NoOpSink, PipelineEvent, ResultSink};
