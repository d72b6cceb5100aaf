//! Stage chains, the logical → wire pipeline, and its sink.

mod runner;
mod sink;
mod stages;

pub use runner::Pipeline;
pub use sink::{PipelineSink, SinkMode};
pub use stages::{Stage, StageChain};
