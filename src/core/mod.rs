pub mod etl;
pub mod pipeline;

pub use crate::domain::ports::{ActivitySource, ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
pub use etl::EtlEngine;
pub use pipeline::ReviewPipeline;
