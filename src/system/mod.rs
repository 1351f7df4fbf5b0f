pub mod chain;
pub mod collector;
pub mod cpu;
pub mod disk;
pub mod info;
pub mod memory;
pub mod mock;
pub mod platform;
pub mod process;
pub mod snapshot;
pub mod source;

pub use collector::{CollectOptions, Collector};
pub use snapshot::{CoreMetric, RunStats, Snapshot};
pub use source::{SourceReader, SystemSource};
