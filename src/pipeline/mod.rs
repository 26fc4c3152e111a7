//! Multi-stage digest pipeline.
//!
//! Collect → analyze → classify → summarize → report, over a single
//! accumulating state, with an error shortcut to a terminal stage that
//! still yields a well-formed report.

pub mod driver;
pub mod stages;
pub mod state;

pub use driver::Stage;
pub use stages::{DigestPipeline, ERROR_REPORT_TITLE, REPORT_PERIOD, REPORT_TITLE};
pub use state::{CategoryBuckets, PipelineState};
