// Adapters layer: concrete sources, sinks and storage for the detection ports.

pub mod file_source;
pub mod formats;
pub mod http_source;
pub mod memory;
pub mod sinks;
pub mod storage;

pub use file_source::FileSource;
pub use formats::SourceFormat;
pub use http_source::HttpSource;
pub use memory::MemorySource;
pub use sinks::{JsonLinesSink, TracingSink, WebhookSink};
pub use storage::LocalStorage;
