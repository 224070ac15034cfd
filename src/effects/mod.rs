// Effect domain: frame model and the live effect pipeline.

pub mod error;
pub mod filters;
pub mod frame;
pub mod pipeline;
pub mod types;
