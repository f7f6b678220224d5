pub mod analysis;
pub mod archive;
pub mod config;
pub mod engine;
pub mod error;
pub mod loader;
pub mod mining;
pub mod model;
pub mod normalize;
pub mod progress;
pub mod report;
pub mod staged;

pub use config::AppConfig;
pub use engine::{LoadedCorpus, RunEngine, RunOptions, RunResult};
pub use error::Error;
pub use progress::{ProgressReporter, SilentReporter};
