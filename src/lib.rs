pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::DetectionConfig;

pub use adapters::{LocalStorage, MemorySource};
pub use app::build_pipeline;
pub use core::{engine::DetectionEngine, pipeline::InsiderDetectionPipeline};
pub use utils::error::{DetectionError, Result};
