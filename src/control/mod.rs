// Control boundary: the filter selector that drives the pipeline.

pub mod selector;
