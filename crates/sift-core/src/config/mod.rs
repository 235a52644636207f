pub mod defaults;
mod expand_config;
mod recall_config;
mod rerank_config;
mod runtime_config;
mod sift_config;

pub use expand_config::ExpandConfig;
pub use recall_config::RecallConfig;
pub use rerank_config::{PageRankConfig, RerankConfig, RrfWeights};
pub use runtime_config::{PathConfig, RuntimeConfig};
pub use sift_config::{SiftConfig, CONFIG_FILE_NAME};
