pub mod averaging;
pub mod consts;
pub mod convert;
pub mod error;
pub mod frame;
pub mod params;
pub mod peak;
pub mod pipeline;
pub mod roi;
