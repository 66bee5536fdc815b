// Application layer: wiring configuration into runnable pipelines.

pub mod builder;

pub use builder::build_pipeline;
