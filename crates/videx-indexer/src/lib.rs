pub mod capabilities;
pub mod config;
pub mod error;
pub mod layered_indexer;
pub mod progress;
pub mod resource_monitor;
pub mod result;
pub mod scheduler;

pub use capabilities::ImageEmbeddingProvider;
pub use config::IndexerConfig;
pub use error::{IndexerError, IndexerResult};
pub use layered_indexer::{index_video, CancellationToken, Engines, NeverCancelled};
pub use progress::{Outcome, ProgressEvent};
pub use resource_monitor::{PerformanceMode, ResourceMonitor, ResourceSample, ResourceSampler, ThermalState};
pub use result::IndexResult;
pub use scheduler::Scheduler;
