pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::{ActivityCollector, LocalStorage};
pub use config::TeamConfig;
pub use core::{etl::EtlEngine, pipeline::ReviewPipeline};
pub use utils::error::{ReviewError, Result};
