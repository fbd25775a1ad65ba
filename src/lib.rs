pub mod config;
pub mod models;
pub mod image;
pub mod store;
pub mod classify;
pub mod web;
pub mod utils;

// 重新导出主要类型
pub use classify::{ClassificationOutcome, ClassifyPipeline};
pub use config::Config;
pub use store::{ImageHandle, ImageStore};
pub use utils::error::ClassifyError;

pub type Result<T> = std::result::Result<T, ClassifyError>;
